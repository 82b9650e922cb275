use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Abstraction over the solenoid lock driver.
///
/// `engage` energizes the solenoid for a fixed pulse duration and then
/// de-energizes it; it is non-reentrant per pulse. `release` de-energizes
/// immediately. Hardware faults are assumed absent at this seam.
#[async_trait]
pub trait LockActuator: Send + Sync {
    /// Energize for the pulse duration, then de-energize. A second call
    /// during an active pulse is a logged no-op.
    async fn engage(&self);

    /// De-energize immediately
    fn release(&self);
}

/// Lock actuator stand-in that tracks pulses instead of driving GPIO
pub struct MockLockActuator {
    pulse_duration: Duration,
    energized: Arc<AtomicBool>,
    pulse_count: Arc<AtomicU32>,
}

impl MockLockActuator {
    pub fn new(pulse_duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            pulse_duration,
            energized: Arc::new(AtomicBool::new(false)),
            pulse_count: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn is_energized(&self) -> bool {
        self.energized.load(Ordering::SeqCst)
    }

    /// Number of completed or in-flight pulses
    pub fn pulse_count(&self) -> u32 {
        self.pulse_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LockActuator for MockLockActuator {
    async fn engage(&self) {
        // One pulse at a time
        if self
            .energized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Lock pulse already in flight, ignoring engage");
            return;
        }

        self.pulse_count.fetch_add(1, Ordering::SeqCst);
        info!("Solenoid energized");
        sleep(self.pulse_duration).await;
        self.energized.store(false, Ordering::SeqCst);
        info!("Solenoid de-energized");
    }

    fn release(&self) {
        debug!("Solenoid released");
        self.energized.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_engage_pulses_then_releases() {
        let lock = MockLockActuator::new(Duration::from_secs(5));

        let handle = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { lock.engage().await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(lock.is_energized());

        handle.await.unwrap();
        assert!(!lock.is_energized());
        assert_eq!(lock.pulse_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engage_is_non_reentrant() {
        let lock = MockLockActuator::new(Duration::from_secs(5));

        let first = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { lock.engage().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Second engage during the pulse must not start another one
        lock.engage().await;
        assert_eq!(lock.pulse_count(), 1);

        first.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_de_energizes() {
        let lock = MockLockActuator::new(Duration::from_secs(5));

        let handle = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { lock.engage().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        lock.release();
        assert!(!lock.is_energized());

        handle.await.unwrap();
    }
}
