pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod hardware;
pub mod ingest;
pub mod recording;
pub mod storage;
pub mod telemetry;
pub mod upload;

pub use app::{SafeOrchestrator, ShutdownReason};
pub use config::SmartSafeConfig;
pub use controller::{AuthEvent, Controller, PasswordBuffer, SafeState, StatusSnapshot};
pub use error::{Result, SmartSafeError};
pub use events::{EventBus, SafeEvent};
pub use hardware::{
    Display, InputSource, Key, LcdLine, LockActuator, MockKeypad, MockLcd, MockLockActuator,
    MockTiltSensor, TamperSensor, TerminalKeypad,
};
pub use ingest::{handle_status_event, IngestResponse};
pub use recording::{CameraPipeline, MockCameraPipeline, RecordingService};
pub use storage::{FsObjectStore, MemoryObjectStore, ObjectStore};
pub use telemetry::{
    CameraStatus, ChannelTransport, DoorStatus, StatusMessage, TelemetryPublisher,
    TelemetryTransport,
};
pub use upload::{FsUploadSink, UploadSink};
