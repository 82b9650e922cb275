use crate::storage::ObjectStore;
use serde_json::{json, Value};
use tracing::{debug, error};

/// HTTP-style result of one ingest invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestResponse {
    pub status_code: u16,
    pub body: String,
}

impl IngestResponse {
    fn bad_request(details: &str) -> Self {
        Self {
            status_code: 400,
            body: format!("Invalid input: {}", details),
        }
    }

    fn server_error(details: &str) -> Self {
        Self {
            status_code: 500,
            body: format!("Persistence failed: {}", details),
        }
    }
}

const REQUIRED_FIELDS: [&str; 5] = ["time", "status", "cam1", "cam2", "last opened"];

/// Stateless handler for one telemetry status message.
///
/// Validates the required fields, computes the open-session duration, and
/// persists two records keyed by the message timestamp: the raw payload
/// byte-for-byte under `raw_data/` and the processed result under
/// `processed_data/`. Persistence failures propagate as a 500; nothing is
/// retried here.
pub async fn handle_status_event(payload: &str, store: &dyn ObjectStore) -> IngestResponse {
    let event: Value = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => return IngestResponse::bad_request(&e.to_string()),
    };

    for field in REQUIRED_FIELDS {
        if event.get(field).is_none() {
            return IngestResponse::bad_request(&format!("missing field '{}'", field));
        }
    }

    let time = match event["time"].as_u64() {
        Some(time) => time,
        None => return IngestResponse::bad_request("field 'time' must be an integer"),
    };
    let last_opened = match event["last opened"].as_u64() {
        Some(last_opened) => last_opened,
        None => return IngestResponse::bad_request("field 'last opened' must be an integer"),
    };

    let duration = if last_opened != 0 {
        time.saturating_sub(last_opened)
    } else {
        0
    };

    let processed = json!({
        "time": time,
        "status": event["status"],
        "cam1": event["cam1"],
        "cam2": event["cam2"],
        "duration": duration,
    });

    debug!("Ingesting status message at {} (duration {})", time, duration);

    // Raw record first, byte-for-byte as received
    let raw_key = format!("raw_data/smartsafe_raw_{}.json", time);
    if let Err(e) = store.put_object(&raw_key, payload.as_bytes().to_vec()).await {
        error!("Failed to persist raw record {}: {}", raw_key, e);
        return IngestResponse::server_error(&e.to_string());
    }

    let processed_key = format!("processed_data/smartsafe_processed_{}.json", time);
    let processed_body = match serde_json::to_vec(&processed) {
        Ok(body) => body,
        Err(e) => return IngestResponse::server_error(&e.to_string()),
    };
    if let Err(e) = store.put_object(&processed_key, processed_body).await {
        error!("Failed to persist processed record {}: {}", processed_key, e);
        return IngestResponse::server_error(&e.to_string());
    }

    IngestResponse {
        status_code: 200,
        body: format!("Data processed and saved with duration: {}", duration),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;

    #[tokio::test]
    async fn test_zero_last_opened_gives_zero_duration() {
        let store = MemoryObjectStore::new();
        let payload =
            r#"{"time":1000,"status":"open","cam1":"standby","cam2":"standby","last opened":0}"#;

        let response = handle_status_event(payload, &store).await;
        assert_eq!(response.status_code, 200);
        assert!(response.body.contains("duration: 0"));

        let processed: Value = serde_json::from_slice(
            &store
                .get("processed_data/smartsafe_processed_1000.json")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(processed["time"], 1000);
        assert_eq!(processed["status"], "open");
        assert_eq!(processed["cam1"], "standby");
        assert_eq!(processed["cam2"], "standby");
        assert_eq!(processed["duration"], 0);
    }

    #[tokio::test]
    async fn test_duration_computed_from_last_opened() {
        let store = MemoryObjectStore::new();
        let payload = r#"{"time":1000,"status":"open","cam1":"recording","cam2":"standby","last opened":900}"#;

        let response = handle_status_event(payload, &store).await;
        assert_eq!(response.status_code, 200);
        assert!(response.body.contains("duration: 100"));

        let processed: Value = serde_json::from_slice(
            &store
                .get("processed_data/smartsafe_processed_1000.json")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(processed["duration"], 100);
    }

    #[tokio::test]
    async fn test_raw_record_is_byte_identical() {
        let store = MemoryObjectStore::new();
        let payload = r#"{ "time": 1000, "status": "closed",
  "cam1": "standby", "cam2": "standby", "last opened": 0 }"#;

        let response = handle_status_event(payload, &store).await;
        assert_eq!(response.status_code, 200);

        let raw = store.get("raw_data/smartsafe_raw_1000.json").unwrap();
        assert_eq!(raw, payload.as_bytes());
    }

    #[tokio::test]
    async fn test_missing_field_rejected() {
        let store = MemoryObjectStore::new();
        let payload = r#"{"time":1000,"status":"open","cam1":"standby","cam2":"standby"}"#;

        let response = handle_status_event(payload, &store).await;
        assert_eq!(response.status_code, 400);
        assert!(response.body.contains("last opened"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_rejected() {
        let store = MemoryObjectStore::new();
        let response = handle_status_event("not json", &store).await;
        assert_eq!(response.status_code, 400);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_server_error() {
        let store = MemoryObjectStore::new();
        store.set_fail_puts(true);
        let payload =
            r#"{"time":1000,"status":"open","cam1":"standby","cam2":"standby","last opened":0}"#;

        let response = handle_status_event(payload, &store).await;
        assert_eq!(response.status_code, 500);
    }

    #[tokio::test]
    async fn test_publisher_message_is_accepted() {
        use crate::controller::StatusSnapshot;
        use crate::telemetry::StatusMessage;

        let store = MemoryObjectStore::new();
        let snapshot = StatusSnapshot {
            last_opened: 900,
            ..StatusSnapshot::default()
        };
        let payload =
            serde_json::to_string(&StatusMessage::from_snapshot(&snapshot, 1000)).unwrap();

        let response = handle_status_event(&payload, &store).await;
        assert_eq!(response.status_code, 200);
        assert!(response.body.contains("duration: 100"));
    }
}
