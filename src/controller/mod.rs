mod password;
mod status;

pub use password::{AuthEvent, PasswordBuffer};
pub use status::{SafeState, StatusSnapshot};

use crate::config::SmartSafeConfig;
use crate::events::{EventBus, SafeEvent};
use crate::hardware::{Display, InputSource, Key, LcdLine, LockActuator, TamperSensor};
use crate::recording::RecordingService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Core orchestration component owning the safe's state and protocol logic.
///
/// The control cycle task is the sole owner of `SafeState`, the password
/// buffer and the open-edge timestamp; everything else observes state through
/// the watch snapshot. The flags crossing task boundaries
/// (`message_displaying` while a feedback routine runs, `monitoring` while a
/// camera pass is in flight) are atomics with check-and-set semantics.
pub struct Controller {
    passcode: String,
    granted_display: Duration,
    denied_flashes: u32,
    denied_flash: Duration,
    cycle_interval: Duration,

    input: Arc<dyn InputSource>,
    tilt: Arc<dyn TamperSensor>,
    lock: Arc<dyn LockActuator>,
    lcd: Arc<dyn Display>,
    cam1: Arc<RecordingService>,
    cam2: Arc<RecordingService>,
    event_bus: EventBus,

    state: SafeState,
    buffer: PasswordBuffer,
    last_opened: u64,

    message_displaying: Arc<AtomicBool>,
    monitoring: Arc<AtomicBool>,
    feedback_task: Option<JoinHandle<()>>,

    status_tx: watch::Sender<StatusSnapshot>,
}

impl Controller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &SmartSafeConfig,
        input: Arc<dyn InputSource>,
        tilt: Arc<dyn TamperSensor>,
        lock: Arc<dyn LockActuator>,
        lcd: Arc<dyn Display>,
        cam1: Arc<RecordingService>,
        cam2: Arc<RecordingService>,
        event_bus: EventBus,
    ) -> (Self, watch::Receiver<StatusSnapshot>) {
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());

        let controller = Self {
            passcode: config.auth.passcode.clone(),
            granted_display: Duration::from_secs(config.auth.granted_display_seconds),
            denied_flashes: config.auth.denied_flashes,
            denied_flash: Duration::from_millis(config.auth.denied_flash_ms),
            cycle_interval: Duration::from_millis(config.system.cycle_interval_ms),
            input,
            tilt,
            lock,
            lcd,
            cam1,
            cam2,
            event_bus,
            state: SafeState::Locked,
            buffer: PasswordBuffer::new(config.auth.passcode_limit),
            last_opened: 0,
            message_displaying: Arc::new(AtomicBool::new(false)),
            monitoring: Arc::new(AtomicBool::new(false)),
            feedback_task: None,
            status_tx,
        };

        (controller, status_rx)
    }

    /// Run the control cycle at a fixed interval until cancelled
    pub async fn run(mut self, cancellation_token: CancellationToken) {
        info!(
            "Controller running, cycle interval {:?}",
            self.cycle_interval
        );

        let mut ticker = interval(self.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = ticker.tick() => self.cycle(),
            }
        }

        // Shutdown: stop any feedback routine, park the hardware
        if let Some(handle) = self.feedback_task.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.lcd.clear();
        self.lock.release();
        info!("Controller stopped");
    }

    /// One control cycle: sample inputs, advance the state machine, drive
    /// the display, cameras and snapshot.
    pub fn cycle(&mut self) {
        let key = self.input.poll_key();

        self.sample_tilt();

        if !self.message_displaying.load(Ordering::SeqCst) {
            self.password_step(key);
        }

        self.monitor_cameras(key.is_some());

        self.publish_status();
    }

    /// Sample the tilt switch and update the access state. The state mirrors
    /// the last reading; debounce belongs to the sensor.
    fn sample_tilt(&mut self) {
        let tilted = self.tilt.is_tilted();
        let new_state = SafeState::from_tilt(tilted);
        if new_state == self.state {
            return;
        }

        if new_state.is_open() {
            // One open-edge timestamp per open session
            self.last_opened = unix_now();
        }
        self.event_bus.publish_lossy(SafeEvent::TiltChanged {
            tilted,
            timestamp: SystemTime::now(),
        });
        self.state = new_state;
    }

    /// The password-entry protocol. Runs only while locked and no feedback
    /// message is displaying; while open the display is overridden.
    fn password_step(&mut self, key: Option<Key>) {
        if self.state.is_open() {
            self.lcd.write_line(LcdLine::Top, "Authorized:");
            self.lcd.write_line(LcdLine::Bottom, "Safe Open");
            return;
        }

        self.lcd.write_line(LcdLine::Top, "Enter Password:");

        match key {
            Some(k @ Key::Digit(_)) => {
                self.buffer.push(k);
            }
            Some(Key::Star) => {
                self.buffer.backspace();
            }
            Some(Key::Hash) => {
                self.submit();
                return;
            }
            None => {}
        }

        self.lcd.write_line(LcdLine::Bottom, self.buffer.as_str());
    }

    /// Compare the buffer against the passcode and kick off the matching
    /// side effects. The buffer is cleared either way.
    fn submit(&mut self) {
        match self.buffer.submit(&self.passcode) {
            AuthEvent::Accepted => {
                debug!("Passcode accepted");
                self.event_bus.publish_lossy(SafeEvent::AccessGranted {
                    timestamp: SystemTime::now(),
                });

                let lock = Arc::clone(&self.lock);
                tokio::spawn(async move {
                    lock.engage().await;
                });

                self.spawn_accepted_feedback();
            }
            AuthEvent::Rejected => {
                debug!("Passcode rejected");
                self.event_bus.publish_lossy(SafeEvent::AccessDenied {
                    timestamp: SystemTime::now(),
                });

                self.spawn_denied_feedback();
            }
        }
    }

    fn spawn_accepted_feedback(&mut self) {
        if !self.begin_feedback() {
            return;
        }

        let lcd = Arc::clone(&self.lcd);
        let flag = Arc::clone(&self.message_displaying);
        let hold = self.granted_display;

        self.feedback_task = Some(tokio::spawn(async move {
            lcd.write_line(LcdLine::Top, "Authorized:");
            lcd.write_line(LcdLine::Bottom, "Access Granted");
            sleep(hold).await;
            flag.store(false, Ordering::SeqCst);
        }));
    }

    fn spawn_denied_feedback(&mut self) {
        if !self.begin_feedback() {
            return;
        }

        let lcd = Arc::clone(&self.lcd);
        let flag = Arc::clone(&self.message_displaying);
        let flashes = self.denied_flashes;
        let half_period = self.denied_flash;

        self.feedback_task = Some(tokio::spawn(async move {
            lcd.write_line(LcdLine::Top, "Unauthorized:");
            for _ in 0..flashes {
                lcd.write_line(LcdLine::Bottom, "Access Denied");
                sleep(half_period).await;
                lcd.write_line(LcdLine::Bottom, "");
                sleep(half_period).await;
            }
            flag.store(false, Ordering::SeqCst);
        }));
    }

    /// Claim the message-displaying flag. The password step is skipped while
    /// it is set, so at most one feedback routine is ever live.
    fn begin_feedback(&mut self) -> bool {
        if self
            .message_displaying
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Feedback routine already displaying, skipping");
            return false;
        }

        // The previous routine has cleared the flag, so its task is done
        self.feedback_task = None;
        true
    }

    /// Recording trigger policy: locked + key activity starts camera 1,
    /// open starts both. Guarded so monitoring passes never overlap.
    fn monitor_cameras(&self, key_activity: bool) {
        if self
            .monitoring
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        match self.state {
            SafeState::Locked => {
                if key_activity {
                    self.cam1.start();
                }
            }
            SafeState::Open => {
                self.cam1.start();
                self.cam2.start();
            }
        }

        self.monitoring.store(false, Ordering::SeqCst);
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(StatusSnapshot {
            state: self.state,
            cam1_active: self.cam1.is_recording(),
            cam2_active: self.cam2.is_recording(),
            last_opened: self.last_opened,
        });
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
