//! Workshop configuration - rate limiting and history retention

use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Workshop`](crate::Workshop)
///
/// # Example
///
/// ```
/// use armory_workshop::WorkshopConfig;
///
/// // No rate limit and unlimited history (default)
/// let config = WorkshopConfig::default();
/// assert!(config.rate_limit.is_none());
///
/// // 30 mutations per minute per actor, keep the last 1000 records
/// let config = WorkshopConfig::default()
///     .with_rate_limit(30, 60)
///     .with_max_history(1000);
/// assert_eq!(config.rate_limit.map(|r| r.requests), Some(30));
/// assert_eq!(config.max_history, Some(1000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopConfig {
    /// Mutations allowed per actor (None = unlimited)
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Maximum history records kept (None = unlimited)
    #[serde(default)]
    pub max_history: Option<usize>,
}

impl WorkshopConfig {
    /// Allow each actor `requests` mutations per `per_secs` seconds
    pub fn with_rate_limit(mut self, requests: u32, per_secs: u32) -> Self {
        self.rate_limit = Some(RateLimitConfig::new(requests, per_secs));
        self
    }

    /// Keep at most `max` history records
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = Some(max);
        self
    }
}
