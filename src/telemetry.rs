use crate::controller::StatusSnapshot;
use crate::error::{Result, SmartSafeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Wire format of one status message. Field names match the ingest contract,
/// including the space in `"last opened"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub time: u64,
    pub status: DoorStatus,
    pub cam1: CameraStatus,
    pub cam2: CameraStatus,
    #[serde(rename = "last opened")]
    pub last_opened: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Recording,
    Standby,
}

impl StatusMessage {
    /// Build a message from a controller snapshot at the given time
    pub fn from_snapshot(snapshot: &StatusSnapshot, time: u64) -> Self {
        Self {
            time,
            status: if snapshot.state.is_open() {
                DoorStatus::Open
            } else {
                DoorStatus::Closed
            },
            cam1: if snapshot.cam1_active {
                CameraStatus::Recording
            } else {
                CameraStatus::Standby
            },
            cam2: if snapshot.cam2_active {
                CameraStatus::Recording
            } else {
                CameraStatus::Standby
            },
            last_opened: snapshot.last_opened,
        }
    }
}

/// Message-channel seam. Connection management, TLS, resubscription and
/// at-least-once redelivery are the transport's own concern; the publisher
/// treats `publish` as fire-and-forget and resends on the next tick.
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

/// Channel-backed transport for tests and local runs
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<(String, Vec<u8>)>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Vec<u8>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TelemetryTransport for ChannelTransport {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.tx
            .send((topic.to_string(), payload.to_vec()))
            .map_err(|e| SmartSafeError::Transport {
                topic: topic.to_string(),
                details: e.to_string(),
            })
    }
}

/// Periodic status publisher: samples the controller snapshot at a fixed
/// rate, formats a status message and publishes it to the telemetry topic.
pub struct TelemetryPublisher {
    topic: String,
    publish_interval: Duration,
    status_rx: watch::Receiver<StatusSnapshot>,
    transport: Box<dyn TelemetryTransport>,
}

impl TelemetryPublisher {
    pub fn new(
        topic: String,
        publish_interval: Duration,
        status_rx: watch::Receiver<StatusSnapshot>,
        transport: Box<dyn TelemetryTransport>,
    ) -> Self {
        Self {
            topic,
            publish_interval,
            status_rx,
            transport,
        }
    }

    /// Publish on every tick until cancelled. Transport failures are logged
    /// and the message is simply rebuilt and resent on the next tick.
    pub async fn run(self, cancellation_token: CancellationToken) {
        info!(
            "Telemetry publisher running on '{}' every {:?}",
            self.topic, self.publish_interval
        );

        let mut ticker = interval(self.publish_interval);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.publish_once().await {
                        warn!("Telemetry publish failed: {}", e);
                    }
                }
            }
        }

        info!("Telemetry publisher stopped");
    }

    async fn publish_once(&self) -> Result<()> {
        let snapshot = *self.status_rx.borrow();
        let message = StatusMessage::from_snapshot(&snapshot, unix_now());
        let payload = serde_json::to_vec(&message)?;

        debug!("Publishing status: {:?}", message);
        self.transport.publish(&self.topic, &payload).await
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SafeState;

    fn snapshot(open: bool, cam1: bool, cam2: bool, last_opened: u64) -> StatusSnapshot {
        StatusSnapshot {
            state: if open {
                SafeState::Open
            } else {
                SafeState::Locked
            },
            cam1_active: cam1,
            cam2_active: cam2,
            last_opened,
        }
    }

    #[test]
    fn test_message_wire_format() {
        let message = StatusMessage::from_snapshot(&snapshot(true, true, false, 900), 1000);
        let json: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&message).unwrap()).unwrap();

        assert_eq!(json["time"], 1000);
        assert_eq!(json["status"], "open");
        assert_eq!(json["cam1"], "recording");
        assert_eq!(json["cam2"], "standby");
        assert_eq!(json["last opened"], 900);
    }

    #[test]
    fn test_closed_standby_message() {
        let message = StatusMessage::from_snapshot(&snapshot(false, false, false, 0), 1000);
        assert_eq!(message.status, DoorStatus::Closed);
        assert_eq!(message.cam1, CameraStatus::Standby);
        assert_eq!(message.cam2, CameraStatus::Standby);
        assert_eq!(message.last_opened, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publisher_ticks() {
        let (status_tx, status_rx) = watch::channel(snapshot(false, false, false, 0));
        let (transport, mut rx) = ChannelTransport::new();
        let publisher = TelemetryPublisher::new(
            "devices/smartsafe/status".to_string(),
            Duration::from_secs(1),
            status_rx,
            Box::new(transport),
        );

        let token = CancellationToken::new();
        let handle = tokio::spawn(publisher.run(token.clone()));

        // First tick fires immediately, then once per second
        tokio::time::sleep(Duration::from_millis(2500)).await;
        token.cancel();
        handle.await.unwrap();

        let (topic, payload) = rx.recv().await.unwrap();
        assert_eq!(topic, "devices/smartsafe/status");
        let message: StatusMessage = serde_json::from_slice(&payload).unwrap();
        assert_eq!(message.status, DoorStatus::Closed);

        let mut count = 1;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert!(count >= 3);

        drop(status_tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publisher_reflects_snapshot_updates() {
        let (status_tx, status_rx) = watch::channel(snapshot(false, false, false, 0));
        let (transport, mut rx) = ChannelTransport::new();
        let publisher = TelemetryPublisher::new(
            "devices/smartsafe/status".to_string(),
            Duration::from_secs(1),
            status_rx,
            Box::new(transport),
        );

        let token = CancellationToken::new();
        let handle = tokio::spawn(publisher.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        status_tx.send_replace(snapshot(true, true, true, 1234));
        tokio::time::sleep(Duration::from_millis(1100)).await;

        token.cancel();
        handle.await.unwrap();

        let mut last = None;
        while let Ok((_, payload)) = rx.try_recv() {
            last = Some(serde_json::from_slice::<StatusMessage>(&payload).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.status, DoorStatus::Open);
        assert_eq!(last.cam1, CameraStatus::Recording);
        assert_eq!(last.last_opened, 1234);
    }
}
