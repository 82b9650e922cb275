use crate::config::SmartSafeConfig;
use crate::controller::{Controller, StatusSnapshot};
use crate::error::{Result, SmartSafeError};
use crate::events::{EventBus, SafeEvent};
use crate::hardware::{
    Display, InputSource, MockKeypad, MockLcd, MockLockActuator, MockTiltSensor, TerminalKeypad,
};
use crate::recording::{CameraPipeline, MockCameraPipeline, RecordingService};
use crate::telemetry::{ChannelTransport, TelemetryPublisher};
use crate::upload::FsUploadSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// System shutdown reason
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest(String),
    Error(String),
}

/// Main application coordinator: wires the controller to its collaborators,
/// runs the concurrent tasks, and owns graceful shutdown.
pub struct SafeOrchestrator {
    config: SmartSafeConfig,
    event_bus: EventBus,
    cancellation_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    terminal_keypad: Option<Arc<TerminalKeypad>>,
    use_terminal_keypad: bool,
    status_rx: Option<watch::Receiver<StatusSnapshot>>,
    shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
}

impl SafeOrchestrator {
    pub fn new(config: SmartSafeConfig) -> Self {
        let event_bus = EventBus::new(config.system.event_bus_capacity);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            event_bus,
            cancellation_token: CancellationToken::new(),
            tasks: Vec::new(),
            terminal_keypad: None,
            use_terminal_keypad: true,
            status_rx: None,
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
        }
    }

    /// Disable the terminal keypad (tests, dry runs, headless services)
    pub fn set_terminal_keypad(&mut self, enabled: bool) {
        self.use_terminal_keypad = enabled;
    }

    /// Latest controller status, once started
    pub fn status_receiver(&self) -> Option<watch::Receiver<StatusSnapshot>> {
        self.status_rx.clone()
    }

    /// Wire collaborators and spawn the controller and telemetry tasks
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting SmartSafe system");

        let input: Arc<dyn InputSource> = if self.use_terminal_keypad {
            let keypad = Arc::new(TerminalKeypad::start(
                self.event_bus.clone(),
                self.config.keypad.i2c_address,
            ));
            self.terminal_keypad = Some(Arc::clone(&keypad));
            keypad
        } else {
            MockKeypad::new()
        };

        // The tilt switch, solenoid, LCD and camera pipelines sit behind
        // trait seams; the in-memory implementations stand in until the
        // hardware drivers are wired up.
        let tilt = MockTiltSensor::new();
        let lock = MockLockActuator::new(Duration::from_secs(self.config.lock.pulse_seconds));
        let lcd: Arc<dyn Display> = MockLcd::new();
        let pipeline1: Arc<dyn CameraPipeline> = Arc::new(MockCameraPipeline);
        let pipeline2: Arc<dyn CameraPipeline> = Arc::new(MockCameraPipeline);

        let sink = Arc::new(FsUploadSink::new(PathBuf::from(&self.config.upload.bucket)));
        let record_duration = Duration::from_secs(self.config.recording.duration_seconds);
        let artifact_dir = PathBuf::from(&self.config.recording.artifact_path);

        let cam1 = RecordingService::new(
            1,
            pipeline1,
            Arc::clone(&sink) as Arc<dyn crate::upload::UploadSink>,
            self.event_bus.clone(),
            artifact_dir.clone(),
            record_duration,
        );
        let cam2 = RecordingService::new(
            2,
            pipeline2,
            sink,
            self.event_bus.clone(),
            artifact_dir,
            record_duration,
        );

        let (controller, status_rx) = Controller::new(
            &self.config,
            input,
            tilt,
            lock,
            lcd,
            cam1,
            cam2,
            self.event_bus.clone(),
        );
        self.status_rx = Some(status_rx.clone());

        let token = self.cancellation_token.clone();
        self.tasks.push(tokio::spawn(controller.run(token)));

        let (transport, mut published) = ChannelTransport::new();
        let publisher = TelemetryPublisher::new(
            self.config.telemetry.topic.clone(),
            Duration::from_secs(self.config.telemetry.interval_seconds),
            status_rx,
            Box::new(transport),
        );
        let token = self.cancellation_token.clone();
        self.tasks.push(tokio::spawn(publisher.run(token)));

        // Drain the local transport; a broker-backed transport replaces this
        let token = self.cancellation_token.clone();
        self.tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    message = published.recv() => match message {
                        Some((topic, payload)) => {
                            debug!("Published to {}: {}", topic, String::from_utf8_lossy(&payload));
                        }
                        None => break,
                    },
                }
            }
        }));

        info!("SmartSafe system started");
        Ok(())
    }

    /// Run until a shutdown is requested by signal or event, then shut down.
    /// Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        let shutdown_sender =
            self.shutdown_sender
                .take()
                .ok_or_else(|| SmartSafeError::System {
                    message: "Shutdown sender already taken".to_string(),
                })?;
        let shutdown_receiver =
            self.shutdown_receiver
                .take()
                .ok_or_else(|| SmartSafeError::System {
                    message: "Shutdown receiver already taken".to_string(),
                })?;

        self.setup_shutdown_triggers(shutdown_sender);

        let reason = shutdown_receiver
            .await
            .map_err(|_| SmartSafeError::System {
                message: "Shutdown channel closed unexpectedly".to_string(),
            })?;

        info!("Shutdown initiated: {:?}", reason);
        self.shutdown().await;

        Ok(match reason {
            ShutdownReason::Error(_) => 1,
            _ => 0,
        })
    }

    /// Install the shutdown triggers: OS signals and bus shutdown events
    fn setup_shutdown_triggers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        #[cfg(unix)]
        {
            let sender = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate(),
                ) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = sender.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        let sender = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = sender.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });

        let mut events = self.event_bus.subscribe();
        let sender = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let SafeEvent::ShutdownRequested { reason, .. } = event {
                    if let Some(sender) = sender.lock().await.take() {
                        let _ = sender.send(ShutdownReason::UserRequest(reason));
                    }
                    break;
                }
            }
        });
    }

    /// Cancel all tasks and wait for them to finish
    pub async fn shutdown(&mut self) {
        info!("Shutting down SmartSafe system");
        self.cancellation_token.cancel();

        if let Some(keypad) = self.terminal_keypad.take() {
            keypad.stop();
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Task ended with error during shutdown: {}", e);
            }
        }

        info!("SmartSafe system shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn test_config() -> SmartSafeConfig {
        let mut config = SmartSafeConfig::default();
        let artifacts = tempdir().unwrap();
        let bucket = tempdir().unwrap();
        config.recording.artifact_path =
            artifacts.keep().to_string_lossy().into_owned();
        config.upload.bucket = bucket.keep().to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut orchestrator = SafeOrchestrator::new(test_config());
        orchestrator.set_terminal_keypad(false);

        orchestrator.start().await.unwrap();
        assert!(orchestrator.status_receiver().is_some());

        orchestrator.shutdown().await;
        assert!(orchestrator.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_event_ends_run() {
        let mut orchestrator = SafeOrchestrator::new(test_config());
        orchestrator.set_terminal_keypad(false);
        orchestrator.start().await.unwrap();

        let event_bus = orchestrator.event_bus.clone();
        let handle = tokio::spawn(async move { orchestrator.run().await });

        // Give the shutdown listener time to subscribe
        tokio::time::sleep(Duration::from_millis(50)).await;
        event_bus
            .publish(SafeEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: "test".to_string(),
            })
            .unwrap();

        let exit_code = handle.await.unwrap().unwrap();
        assert_eq!(exit_code, 0);
    }
}
