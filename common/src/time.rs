//! Time utilities and constants for fxbrief.

use chrono::{DateTime, Duration, Utc};

/// Service timing constants.
pub mod constants {
    use super::Duration;

    /// How long a fetched quote stays servable from cache (10 minutes).
    pub fn quote_ttl() -> Duration {
        Duration::seconds(600)
    }

    /// Interval between background sweeps of expired cache entries (1 minute).
    pub fn cache_sweep_interval() -> Duration {
        Duration::seconds(60)
    }

    /// Bound on a single outbound call to a rate or commentary provider.
    pub fn upstream_timeout() -> Duration {
        Duration::seconds(10)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check if a timestamp has expired (is in the past).
pub fn is_expired(expiry: Timestamp) -> bool {
    now() >= expiry
}

/// Calculate expiry time from now.
pub fn expires_in(duration: Duration) -> Timestamp {
    now() + duration
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}
