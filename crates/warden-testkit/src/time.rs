//! Controllable time source for deterministic expiry tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use warden_core::{PhysicalTime, PhysicalTimeEffects, TimeError};

/// Clock that only moves when told to.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock frozen at `secs` seconds after the epoch.
    pub fn at_secs(secs: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(secs.saturating_mul(1000))),
        }
    }

    /// Advance by `secs` seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.now_ms
            .fetch_add(secs.saturating_mul(1000), Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set_secs(&self, secs: u64) {
        self.now_ms.store(secs.saturating_mul(1000), Ordering::SeqCst);
    }

    /// Current reading in whole seconds.
    pub fn now_secs(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst) / 1000
    }

    /// Shareable handle for the manager builder.
    pub fn effects(&self) -> Arc<dyn PhysicalTimeEffects> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl PhysicalTimeEffects for ManualClock {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        Ok(PhysicalTime::from_ms(self.now_ms.load(Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clock_moves_only_when_told() {
        let clock = ManualClock::at_secs(100);
        let effects = clock.effects();
        assert_eq!(effects.physical_time().await.unwrap().as_secs(), 100);

        clock.advance_secs(5);
        assert_eq!(effects.physical_time().await.unwrap().as_secs(), 105);

        clock.set_secs(7);
        assert_eq!(clock.now_secs(), 7);
    }
}
