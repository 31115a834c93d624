//! Physical time effect.
//!
//! The broker never reads the system clock directly; expiry checks go through
//! [`PhysicalTimeEffects`] so tests can drive time deterministically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Error type for time operations.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum TimeError {
    #[error("Clock unavailable: {reason}")]
    ClockUnavailable { reason: String },
    #[error("Time service unavailable")]
    ServiceUnavailable,
}

/// Wall-clock instant in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalTime {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Build from milliseconds since the epoch.
    pub fn from_ms(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// Build from whole seconds since the epoch.
    pub fn from_secs(secs: u64) -> Self {
        Self {
            ts_ms: secs.saturating_mul(1000),
        }
    }

    /// Whole seconds since the epoch.
    pub fn as_secs(&self) -> u64 {
        self.ts_ms / 1000
    }
}

/// Source of wall-clock time.
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current time.
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError>;
}

/// Production time handler backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeHandler;

#[async_trait]
impl PhysicalTimeEffects for SystemTimeHandler {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TimeError::ClockUnavailable {
                reason: e.to_string(),
            })?;
        Ok(PhysicalTime::from_ms(elapsed.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_round_trip() {
        let t = PhysicalTime::from_secs(1_700_000_000);
        assert_eq!(t.as_secs(), 1_700_000_000);
        assert_eq!(PhysicalTime::from_ms(1_999).as_secs(), 1);
    }

    #[tokio::test]
    async fn system_clock_is_after_2020() {
        let now = SystemTimeHandler.physical_time().await.unwrap();
        assert!(now.as_secs() > 1_577_836_800);
    }
}
