use serde_json::{json, Value};

use crate::adapters::queue::QueueAcknowledger;
use crate::adapters::topic::TopicPublisher;
use crate::runtime::contract::{
    decode_queue_event, NotificationEnvelope, QueueRecord, RelayFailureKind, RelayRecordFailure,
    RelaySummary,
};
use crate::runtime::response::{success_response, validation_error_response, ApiGatewayResponse};

/// Forwards a batch of queue records to the notification topic, best-effort.
///
/// Each record is processed inside its own failure scope: a malformed record
/// or a collaborator fault is captured in the summary and the batch moves on.
/// An absent or empty batch is a valid no-op input.
pub fn handle_relay_event(
    event: Value,
    publisher: &dyn TopicPublisher,
    acknowledger: &dyn QueueAcknowledger,
) -> ApiGatewayResponse {
    let records = match decode_queue_event(&event) {
        Ok(records) => records,
        Err(error) => return validation_error_response(error.message()),
    };

    if records.is_empty() {
        log_relay_info("empty_batch", json!({}));
        return success_response(
            200,
            json!({
                "status": "no_messages",
                "forwarded": 0,
            }),
        );
    }

    let summary = relay_records(&records, publisher, acknowledger);
    log_relay_info(
        "batch_completed",
        json!({
            "records": records.len(),
            "forwarded": summary.forwarded,
            "failures": summary.failures.len(),
        }),
    );

    success_response(
        200,
        json!({
            "status": "completed",
            "forwarded": summary.forwarded,
            "failures": summary.failures,
        }),
    )
}

pub fn relay_records(
    records: &[QueueRecord],
    publisher: &dyn TopicPublisher,
    acknowledger: &dyn QueueAcknowledger,
) -> RelaySummary {
    let mut summary = RelaySummary::default();

    for (record_index, record) in records.iter().enumerate() {
        let (body, receipt_handle) = match record.well_formed_parts() {
            Ok(parts) => parts,
            Err(reason) => {
                log_relay_error(
                    "malformed_record",
                    json!({"record_index": record_index, "reason": reason}),
                );
                summary.failures.push(RelayRecordFailure {
                    record_index,
                    kind: RelayFailureKind::MalformedRecord,
                    message: reason.to_string(),
                });
                continue;
            }
        };

        if let Err(error) = publisher.publish(&NotificationEnvelope::for_body(body)) {
            log_relay_error(
                "publish_failed",
                json!({"record_index": record_index, "error": error.clone()}),
            );
            summary.failures.push(RelayRecordFailure {
                record_index,
                kind: RelayFailureKind::PublishFailed,
                message: error,
            });
            continue;
        }

        // Delete only after the publish is confirmed. An unacknowledged
        // message is redelivered by the queue, so a crash between the two
        // calls costs at most a duplicate notification.
        if let Err(error) = acknowledger.delete_message(receipt_handle) {
            log_relay_error(
                "delete_failed",
                json!({"record_index": record_index, "error": error.clone()}),
            );
            summary.failures.push(RelayRecordFailure {
                record_index,
                kind: RelayFailureKind::DeleteFailed,
                message: error,
            });
            continue;
        }

        summary.forwarded += 1;
    }

    summary
}

fn log_relay_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "relay_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_relay_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "relay_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct CapturingPublisher {
        envelopes: Mutex<Vec<NotificationEnvelope>>,
        denied_body: Option<&'static str>,
    }

    impl CapturingPublisher {
        fn new() -> Self {
            Self {
                envelopes: Mutex::new(Vec::new()),
                denied_body: None,
            }
        }

        fn denying(denied_body: &'static str) -> Self {
            Self {
                envelopes: Mutex::new(Vec::new()),
                denied_body: Some(denied_body),
            }
        }

        fn envelopes(&self) -> Vec<NotificationEnvelope> {
            self.envelopes.lock().expect("poisoned mutex").clone()
        }
    }

    impl TopicPublisher for CapturingPublisher {
        fn publish(&self, envelope: &NotificationEnvelope) -> Result<(), String> {
            if self.denied_body == Some(envelope.message.as_str()) {
                return Err(format!("simulated publish failure: {}", envelope.message));
            }

            self.envelopes
                .lock()
                .expect("poisoned mutex")
                .push(envelope.clone());
            Ok(())
        }
    }

    struct CapturingAcknowledger {
        receipts: Mutex<Vec<String>>,
        denied_receipt: Option<&'static str>,
    }

    impl CapturingAcknowledger {
        fn new() -> Self {
            Self {
                receipts: Mutex::new(Vec::new()),
                denied_receipt: None,
            }
        }

        fn denying(denied_receipt: &'static str) -> Self {
            Self {
                receipts: Mutex::new(Vec::new()),
                denied_receipt: Some(denied_receipt),
            }
        }

        fn receipts(&self) -> Vec<String> {
            self.receipts.lock().expect("poisoned mutex").clone()
        }
    }

    impl QueueAcknowledger for CapturingAcknowledger {
        fn delete_message(&self, receipt_handle: &str) -> Result<(), String> {
            if self.denied_receipt == Some(receipt_handle) {
                return Err(format!("simulated delete failure: {receipt_handle}"));
            }

            self.receipts
                .lock()
                .expect("poisoned mutex")
                .push(receipt_handle.to_string());
            Ok(())
        }
    }

    fn batch_event(records: Value) -> Value {
        json!({ "Records": records })
    }

    fn body_of(response: &ApiGatewayResponse) -> Value {
        serde_json::from_str(&response.body).expect("body should parse")
    }

    #[test]
    fn forwards_then_deletes_each_well_formed_record() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::new();
        let response = handle_relay_event(
            batch_event(json!([
                {"body": "upload-1", "receiptHandle": "rh-1"},
                {"body": "upload-2", "receiptHandle": "rh-2"},
            ])),
            &publisher,
            &acknowledger,
        );

        assert_eq!(response.status_code, 200);
        let body = body_of(&response);
        assert_eq!(body["forwarded"], 2);
        assert_eq!(body["failures"], json!([]));

        let envelopes = publisher.envelopes();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].subject, "Processed SQS Queue Messages");
        assert_eq!(envelopes[0].message, "upload-1");
        assert_eq!(acknowledger.receipts(), vec!["rh-1", "rh-2"]);
    }

    #[test]
    fn empty_batch_is_a_noop_success() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::new();
        let response = handle_relay_event(json!({}), &publisher, &acknowledger);

        assert_eq!(response.status_code, 200);
        assert_eq!(body_of(&response)["status"], "no_messages");
        assert!(publisher.envelopes().is_empty());
        assert!(acknowledger.receipts().is_empty());
    }

    #[test]
    fn rejects_malformed_event_shape_without_forwarding() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::new();
        let response =
            handle_relay_event(json!({"Records": 17}), &publisher, &acknowledger);

        assert_eq!(response.status_code, 400);
        assert_eq!(body_of(&response)["error"], "validation_error");
        assert!(publisher.envelopes().is_empty());
    }

    #[test]
    fn bodyless_record_is_isolated_from_the_rest_of_the_batch() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::new();
        let response = handle_relay_event(
            batch_event(json!([
                {"body": "upload-1", "receiptHandle": "rh-1"},
                {"receiptHandle": "rh-2"},
                {"body": "upload-3", "receiptHandle": "rh-3"},
            ])),
            &publisher,
            &acknowledger,
        );

        let body = body_of(&response);
        assert_eq!(body["forwarded"], 2);
        assert_eq!(body["failures"][0]["record_index"], 1);
        assert_eq!(body["failures"][0]["kind"], "MalformedRecord");
        assert_eq!(body["failures"][0]["message"], "record has no body");
        assert_eq!(acknowledger.receipts(), vec!["rh-1", "rh-3"]);
    }

    #[test]
    fn record_without_receipt_handle_is_classified_as_such() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::new();
        let response = handle_relay_event(
            batch_event(json!([
                {"body": "upload-1"},
            ])),
            &publisher,
            &acknowledger,
        );

        let body = body_of(&response);
        assert_eq!(body["forwarded"], 0);
        assert_eq!(body["failures"][0]["kind"], "MalformedRecord");
        assert_eq!(body["failures"][0]["message"], "record has no receipt handle");
        assert!(publisher.envelopes().is_empty());
    }

    #[test]
    fn publish_failure_leaves_the_message_on_the_queue() {
        let publisher = CapturingPublisher::denying("upload-2");
        let acknowledger = CapturingAcknowledger::new();
        let summary = relay_records(
            &[
                QueueRecord {
                    body: Some("upload-1".to_string()),
                    receipt_handle: Some("rh-1".to_string()),
                },
                QueueRecord {
                    body: Some("upload-2".to_string()),
                    receipt_handle: Some("rh-2".to_string()),
                },
            ],
            &publisher,
            &acknowledger,
        );

        assert_eq!(summary.forwarded, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, RelayFailureKind::PublishFailed);
        // The failed record was never acknowledged; the queue redelivers it.
        assert_eq!(acknowledger.receipts(), vec!["rh-1"]);
    }

    #[test]
    fn delete_failure_is_not_counted_as_forwarded() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::denying("rh-1");
        let summary = relay_records(
            &[QueueRecord {
                body: Some("upload-1".to_string()),
                receipt_handle: Some("rh-1".to_string()),
            }],
            &publisher,
            &acknowledger,
        );

        assert_eq!(summary.forwarded, 0);
        assert_eq!(summary.failures[0].kind, RelayFailureKind::DeleteFailed);
        assert_eq!(publisher.envelopes().len(), 1);
    }

    #[test]
    fn forwarded_count_never_exceeds_well_formed_records() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::new();
        let records = vec![
            QueueRecord {
                body: None,
                receipt_handle: Some("rh-1".to_string()),
            },
            QueueRecord {
                body: Some("upload-2".to_string()),
                receipt_handle: Some("rh-2".to_string()),
            },
        ];

        let summary = relay_records(&records, &publisher, &acknowledger);
        assert!(summary.forwarded <= 1);
        assert_eq!(summary.forwarded + summary.failures.len(), records.len());
    }

    #[test]
    fn redelivered_record_is_forwarded_again_and_deleted_again() {
        let publisher = CapturingPublisher::new();
        let acknowledger = CapturingAcknowledger::new();
        let record = QueueRecord {
            body: Some("upload-1".to_string()),
            receipt_handle: Some("rh-1".to_string()),
        };

        let first = relay_records(std::slice::from_ref(&record), &publisher, &acknowledger);
        let second = relay_records(std::slice::from_ref(&record), &publisher, &acknowledger);

        // Redelivery simulation: deletion is idempotent at the queue, so a
        // second pass acknowledges again instead of stranding the message.
        assert_eq!(first.forwarded, 1);
        assert_eq!(second.forwarded, 1);
        assert_eq!(acknowledger.receipts(), vec!["rh-1", "rh-1"]);
    }
}
