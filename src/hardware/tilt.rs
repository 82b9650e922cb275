use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Abstraction over the tilt switch that senses the safe door.
///
/// The reading is updated asynchronously by the hardware interrupt path;
/// debouncing is the implementation's responsibility. The controller samples
/// this once per control cycle.
pub trait TamperSensor: Send + Sync {
    /// Current debounced reading: true while tilted (door open)
    fn is_tilted(&self) -> bool;

    /// Timestamp of the last state transition
    fn last_change(&self) -> SystemTime;
}

/// Tilt sensor stand-in driven by tests or a simulator
pub struct MockTiltSensor {
    tilted: AtomicBool,
    last_change: Mutex<SystemTime>,
}

impl MockTiltSensor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tilted: AtomicBool::new(false),
            last_change: Mutex::new(SystemTime::now()),
        })
    }

    /// Drive the sensor reading, recording the transition time
    pub fn set_tilted(&self, tilted: bool) {
        let previous = self.tilted.swap(tilted, Ordering::SeqCst);
        if previous != tilted {
            *self.last_change.lock() = SystemTime::now();
        }
    }
}

impl TamperSensor for MockTiltSensor {
    fn is_tilted(&self) -> bool {
        self.tilted.load(Ordering::SeqCst)
    }

    fn last_change(&self) -> SystemTime {
        *self.last_change.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_stable() {
        let sensor = MockTiltSensor::new();
        assert!(!sensor.is_tilted());
    }

    #[test]
    fn test_transition_updates_timestamp() {
        let sensor = MockTiltSensor::new();
        let before = sensor.last_change();

        sensor.set_tilted(true);
        assert!(sensor.is_tilted());
        assert!(sensor.last_change() >= before);

        // Setting the same state again is not a transition
        let at_tilt = sensor.last_change();
        sensor.set_tilted(true);
        assert_eq!(sensor.last_change(), at_tilt);
    }
}
