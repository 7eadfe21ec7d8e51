use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subject line attached to every forwarded notification.
pub const NOTIFICATION_SUBJECT: &str = "Processed SQS Queue Messages";

/// Literal body returned by a reconciliation scan that found nothing.
pub const CLEAN_SCAN_MARKER: &str = "No inconsistencies found";

/// One record of the queue trigger batch, as delivered in the event's
/// `Records` array. A record without a usable body or receipt handle is
/// malformed input, not a decode failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueRecord {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "receiptHandle", default)]
    pub receipt_handle: Option<String>,
}

impl QueueRecord {
    /// Body and receipt handle when both are present and non-empty, else
    /// the reason the record is malformed.
    pub fn well_formed_parts(&self) -> Result<(&str, &str), &'static str> {
        let body = self
            .body
            .as_deref()
            .filter(|body| !body.is_empty())
            .ok_or("record has no body")?;
        let receipt_handle = self
            .receipt_handle
            .as_deref()
            .filter(|handle| !handle.trim().is_empty())
            .ok_or("record has no receipt handle")?;
        Ok((body, receipt_handle))
    }
}

/// Notification published to the topic for one forwarded record. The body
/// is copied verbatim from the queue record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEnvelope {
    pub subject: String,
    pub message: String,
}

impl NotificationEnvelope {
    pub fn for_body(body: impl Into<String>) -> Self {
        Self {
            subject: NOTIFICATION_SUBJECT.to_string(),
            message: body.into(),
        }
    }
}

/// One row of the catalog table: object key (column `name`) and the size
/// the blob store is expected to report (column `size`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogRow {
    pub object_key: String,
    pub expected_size: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InconsistencyKind {
    SizeMismatch,
    NotFound,
}

/// A catalog row whose expected state disagrees with the blob store.
/// Field names match the serialized report shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inconsistency {
    pub object: String,
    pub bucket: String,
    #[serde(rename = "Error")]
    pub kind: InconsistencyKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelayFailureKind {
    MalformedRecord,
    PublishFailed,
    DeleteFailed,
}

/// Per-record failure captured by the best-effort relay loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayRecordFailure {
    pub record_index: usize,
    pub kind: RelayFailureKind,
    pub message: String,
}

/// Outcome of one relay invocation: how many records were both published
/// and deleted, plus every per-record failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelaySummary {
    pub forwarded: usize,
    pub failures: Vec<RelayRecordFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Decodes the relay trigger event into its record batch.
///
/// An absent event, an event without `Records`, or a null/empty `Records`
/// value are all valid no-op inputs. Any other shape is rejected so that
/// silently-undefined fields never reach the forwarding loop.
pub fn decode_queue_event(event: &Value) -> Result<Vec<QueueRecord>, ValidationError> {
    if event.is_null() {
        return Ok(Vec::new());
    }

    let Some(object) = event.as_object() else {
        return Err(ValidationError::new("Relay event must be a JSON object"));
    };

    let records = match object.get("Records") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(ValidationError::new(
                "Relay event field 'Records' must be an array",
            ));
        }
    };

    records
        .iter()
        .map(|record| {
            serde_json::from_value(record.clone())
                .map_err(|error| ValidationError::new(format!("Malformed queue record: {error}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_treats_absent_batch_as_noop() {
        assert_eq!(decode_queue_event(&Value::Null), Ok(Vec::new()));
        assert_eq!(decode_queue_event(&json!({})), Ok(Vec::new()));
        assert_eq!(decode_queue_event(&json!({"Records": null})), Ok(Vec::new()));
    }

    #[test]
    fn decode_rejects_non_array_records() {
        let error =
            decode_queue_event(&json!({"Records": "nope"})).expect_err("decode should fail");
        assert_eq!(error.message(), "Relay event field 'Records' must be an array");
    }

    #[test]
    fn decode_keeps_bodyless_records_for_classification() {
        let records = decode_queue_event(&json!({
            "Records": [
                {"body": "payload", "receiptHandle": "rh-1"},
                {"receiptHandle": "rh-2"},
            ]
        }))
        .expect("decode should pass");

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].well_formed_parts(),
            Ok(("payload", "rh-1"))
        );
        assert_eq!(records[1].well_formed_parts(), Err("record has no body"));
    }

    #[test]
    fn empty_body_is_not_well_formed() {
        let record = QueueRecord {
            body: Some(String::new()),
            receipt_handle: Some("rh-3".to_string()),
        };
        assert_eq!(record.well_formed_parts(), Err("record has no body"));
    }

    #[test]
    fn blank_receipt_handle_is_reported_as_such() {
        let record = QueueRecord {
            body: Some("payload".to_string()),
            receipt_handle: Some("  ".to_string()),
        };
        assert_eq!(
            record.well_formed_parts(),
            Err("record has no receipt handle")
        );
    }

    #[test]
    fn inconsistency_serializes_with_report_field_names() {
        let entry = Inconsistency {
            object: "b".to_string(),
            bucket: "uploads".to_string(),
            kind: InconsistencyKind::NotFound,
        };

        assert_eq!(
            serde_json::to_value(&entry).expect("inconsistency should serialize"),
            json!({"object": "b", "bucket": "uploads", "Error": "NotFound"})
        );
    }
}
