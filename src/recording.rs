use crate::error::Result;
use crate::events::{EventBus, SafeEvent};
use crate::upload::UploadSink;
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Video pipeline seam: encoding and the camera stack live behind this.
#[async_trait]
pub trait CameraPipeline: Send + Sync {
    /// Start encoding into the given artifact path
    async fn begin(&self, path: &Path) -> Result<()>;

    /// Stop encoding and finalize the artifact
    async fn end(&self) -> Result<()>;
}

/// Pipeline stand-in that writes a stub artifact on `begin`
pub struct MockCameraPipeline;

#[async_trait]
impl CameraPipeline for MockCameraPipeline {
    async fn begin(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, b"").await?;
        Ok(())
    }

    async fn end(&self) -> Result<()> {
        Ok(())
    }
}

/// One camera's recording service.
///
/// `start` is idempotent: the active flag is atomically checked-and-set, so
/// at most one session runs per camera. A session always runs to completion:
/// begin, sleep for the fixed record duration, end, hand the artifact to the
/// upload sink, delete the local file on success, clear the flag.
pub struct RecordingService {
    camera: u8,
    pipeline: Arc<dyn CameraPipeline>,
    sink: Arc<dyn UploadSink>,
    event_bus: EventBus,
    artifact_dir: PathBuf,
    record_duration: Duration,
    active: Arc<AtomicBool>,
}

impl RecordingService {
    pub fn new(
        camera: u8,
        pipeline: Arc<dyn CameraPipeline>,
        sink: Arc<dyn UploadSink>,
        event_bus: EventBus,
        artifact_dir: PathBuf,
        record_duration: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            camera,
            pipeline,
            sink,
            event_bus,
            artifact_dir,
            record_duration,
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether a session is currently in flight
    pub fn is_recording(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a recording session unless one is active. Returns true if a new
    /// session was started.
    pub fn start(self: &Arc<Self>) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Camera {} already recording, start ignored", self.camera);
            return false;
        }

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run_session().await;
        });
        true
    }

    async fn run_session(&self) {
        let session_id = Uuid::new_v4().to_string();
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let filename = format!("picam{}_log_{}.mp4", self.camera, timestamp);
        let artifact = self.artifact_dir.join(&filename);

        info!("Camera {} recording to {}", self.camera, artifact.display());
        self.event_bus.publish_lossy(SafeEvent::RecordingStarted {
            camera: self.camera,
            session_id: session_id.clone(),
        });

        if let Err(e) = self.pipeline.begin(&artifact).await {
            error!("Camera {} failed to start pipeline: {}", self.camera, e);
            self.event_bus.publish_lossy(SafeEvent::SystemError {
                component: format!("camera{}", self.camera),
                error: e.to_string(),
            });
            self.active.store(false, Ordering::SeqCst);
            return;
        }

        // Fixed-duration session; not cancellable mid-flight
        sleep(self.record_duration).await;

        if let Err(e) = self.pipeline.end().await {
            error!("Camera {} failed to stop pipeline: {}", self.camera, e);
        }
        info!("Camera {} stopped recording", self.camera);

        let key = format!("picamera{}/{}", self.camera, filename);
        match self.sink.upload(&artifact, &key).await {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&artifact).await {
                    warn!(
                        "Failed to delete local artifact {}: {}",
                        artifact.display(),
                        e
                    );
                }
                self.event_bus
                    .publish_lossy(SafeEvent::UploadCompleted { key });
            }
            Err(e) => {
                // Best effort only; the artifact stays on disk
                self.event_bus.publish_lossy(SafeEvent::UploadFailed {
                    key,
                    error: e.to_string(),
                });
            }
        }

        self.active.store(false, Ordering::SeqCst);
        self.event_bus.publish_lossy(SafeEvent::RecordingCompleted {
            camera: self.camera,
            session_id,
        });
    }
}
