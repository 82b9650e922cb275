use crate::error::{Result, SmartSafeError};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the smartsafe system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SafeEvent {
    /// A keypad key was pressed
    KeyPressed { key: char, timestamp: SystemTime },
    /// An entered passcode was accepted
    AccessGranted { timestamp: SystemTime },
    /// An entered passcode was rejected
    AccessDenied { timestamp: SystemTime },
    /// The tilt switch changed state
    TiltChanged { tilted: bool, timestamp: SystemTime },
    /// A camera started recording
    RecordingStarted { camera: u8, session_id: String },
    /// A camera finished its recording session
    RecordingCompleted { camera: u8, session_id: String },
    /// An artifact was handed off to the upload sink
    UploadCompleted { key: String },
    /// An upload failed; the artifact stays on local storage
    UploadFailed { key: String, error: String },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl SafeEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SafeEvent::KeyPressed { key, .. } => format!("Key '{}' pressed", key),
            SafeEvent::AccessGranted { .. } => "Access granted".to_string(),
            SafeEvent::AccessDenied { .. } => "Access denied".to_string(),
            SafeEvent::TiltChanged { tilted, .. } => {
                format!("Tilt switch {}", if *tilted { "tilted" } else { "stable" })
            }
            SafeEvent::RecordingStarted { camera, session_id } => {
                format!("Camera {} recording (session {})", camera, session_id)
            }
            SafeEvent::RecordingCompleted { camera, session_id } => {
                format!("Camera {} stopped (session {})", camera, session_id)
            }
            SafeEvent::UploadCompleted { key } => format!("Upload successful: {}", key),
            SafeEvent::UploadFailed { key, error } => {
                format!("Upload failed for {}: {}", key, error)
            }
            SafeEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            SafeEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering and logging
    pub fn event_type(&self) -> &'static str {
        match self {
            SafeEvent::KeyPressed { .. } => "key_pressed",
            SafeEvent::AccessGranted { .. } => "access_granted",
            SafeEvent::AccessDenied { .. } => "access_denied",
            SafeEvent::TiltChanged { .. } => "tilt_changed",
            SafeEvent::RecordingStarted { .. } => "recording_started",
            SafeEvent::RecordingCompleted { .. } => "recording_completed",
            SafeEvent::UploadCompleted { .. } => "upload_completed",
            SafeEvent::UploadFailed { .. } => "upload_failed",
            SafeEvent::SystemError { .. } => "system_error",
            SafeEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<SafeEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<SafeEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SafeEvent) -> Result<usize> {
        // Log important events at appropriate levels
        match &event {
            SafeEvent::AccessGranted { .. } => info!("Access granted"),
            SafeEvent::AccessDenied { .. } => warn!("Access denied"),
            SafeEvent::TiltChanged { tilted, .. } => {
                if *tilted {
                    warn!("Safe opened (tilt detected)");
                } else {
                    info!("Safe closed (tilt cleared)");
                }
            }
            SafeEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            SafeEvent::UploadFailed { key, error } => {
                warn!("Upload failed for {}: {}", key, error);
            }
            SafeEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| SmartSafeError::component("event_bus".to_string(), e.to_string()))
    }

    /// Publish with the error swallowed; a bus with no subscribers is not a fault
    pub fn publish_lossy(&self, event: SafeEvent) {
        let _ = self.publish(event);
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let event = SafeEvent::KeyPressed {
            key: '5',
            timestamp: SystemTime::now(),
        };

        let subscriber_count = event_bus.publish(event).unwrap();
        assert_eq!(subscriber_count, 1);

        let received = receiver.recv().await.unwrap();
        match received {
            SafeEvent::KeyPressed { key, .. } => assert_eq!(key, '5'),
            _ => panic!("Unexpected event type"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus
            .publish(SafeEvent::AccessGranted {
                timestamp: SystemTime::now(),
            })
            .unwrap();

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_event_properties() {
        let event = SafeEvent::RecordingStarted {
            camera: 1,
            session_id: "abc".to_string(),
        };

        assert_eq!(event.event_type(), "recording_started");
        assert!(event.description().contains("Camera 1"));
    }

    #[test]
    fn test_publish_lossy_without_subscribers() {
        let event_bus = EventBus::new(10);
        // No subscribers; must not panic
        event_bus.publish_lossy(SafeEvent::AccessDenied {
            timestamp: SystemTime::now(),
        });
    }
}
