/// Tunables shared by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Extra tries a submission gets after losing a compare-and-swap race.
    pub max_write_retries: u32,
    /// Recommendation limit used when the caller does not give one.
    pub default_recommendation_limit: usize,
}

impl ServiceConfig {
    pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 5;
    pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_write_retries: Self::DEFAULT_MAX_WRITE_RETRIES,
            default_recommendation_limit: Self::DEFAULT_RECOMMENDATION_LIMIT,
        }
    }
}
