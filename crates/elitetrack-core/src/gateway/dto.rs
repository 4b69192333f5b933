//! Shape checks for records arriving from the store or the push bridge.
//!
//! Remote rows are loosely typed. A record that decodes but breaks an
//! invariant the core relies on is refused as a persistence failure instead
//! of being merged.

use serde::de::DeserializeOwned;

use crate::{
    error::{Result, TrackerError},
    models::{ConversationRecord, MessageRecord, ProjectRecord, QuoteRecord, RecordId},
};

/// Structural invariants of an incoming record.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), String>;
}

fn canonical(field: &str, id: &RecordId) -> std::result::Result<(), String> {
    if id.as_str().trim().is_empty() {
        Err(format!("{field} is empty"))
    } else if id.is_provisional() {
        Err(format!("{field} '{id}' is not a canonical id"))
    } else {
        Ok(())
    }
}

impl Validate for ProjectRecord {
    fn validate(&self) -> std::result::Result<(), String> {
        canonical("id", &self.id)?;
        canonical("client_id", &self.client_id)?;
        canonical("vehicle_id", &self.vehicle_id)?;
        if self.qr_code.trim().is_empty() {
            return Err("qr_code is empty".to_string());
        }
        if self.progress > 100 {
            return Err(format!("progress {} exceeds 100", self.progress));
        }
        for (i, step) in self.timeline.iter().enumerate() {
            canonical("step id", &step.id)?;
            if step.position as usize != i {
                return Err(format!(
                    "step '{}' has position {} at index {i}",
                    step.id, step.position
                ));
            }
            if step.project_id != self.id {
                return Err(format!(
                    "step '{}' belongs to '{}', not '{}'",
                    step.id, step.project_id, self.id
                ));
            }
        }
        Ok(())
    }
}

impl Validate for ConversationRecord {
    fn validate(&self) -> std::result::Result<(), String> {
        canonical("id", &self.id)?;
        canonical("project_id", &self.project_id)
    }
}

impl Validate for MessageRecord {
    fn validate(&self) -> std::result::Result<(), String> {
        canonical("id", &self.id)?;
        canonical("conversation_id", &self.conversation_id)?;
        if self.sender_id.as_str().is_empty() {
            return Err("sender_id is empty".to_string());
        }
        Ok(())
    }
}

impl Validate for QuoteRecord {
    fn validate(&self) -> std::result::Result<(), String> {
        canonical("id", &self.id)?;
        canonical("client_id", &self.client_id)?;
        if let Some(project_id) = &self.project_id {
            canonical("project_id", project_id)?;
        }
        if let Some(price) = self.estimated_price {
            if !price.is_finite() || price < 0.0 {
                return Err(format!("estimated_price {price} is invalid"));
            }
        }
        Ok(())
    }
}

/// Checks one record returned by `operation`.
pub fn checked<R: Validate>(operation: &str, record: R) -> Result<R> {
    record
        .validate()
        .map_err(|reason| TrackerError::persistence(operation, reason))?;
    Ok(record)
}

/// Checks every record of a query result.
pub fn checked_all<R: Validate>(operation: &str, records: Vec<R>) -> Result<Vec<R>> {
    records.into_iter().map(|r| checked(operation, r)).collect()
}

/// Decodes and checks a push payload.
pub fn decode<R: DeserializeOwned + Validate>(payload: &serde_json::Value) -> Result<R> {
    let record = R::deserialize(payload)
        .map_err(|e| TrackerError::persistence("decode push payload", e))?;
    checked("decode push payload", record)
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use serde_json::json;

    use super::*;
    use crate::{error::ErrorCategory, models::Role};

    fn message_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "conversation_id": "cnv_1",
            "sender_id": "exe_1",
            "sender_name": "Carlos",
            "sender_role": "executor",
            "content": "Glass arrived",
            "created_at": "2025-01-01T12:00:00Z",
            "read": false
        })
    }

    #[test]
    fn test_decode_valid_message() {
        let message: MessageRecord = decode(&message_json("msg_4")).unwrap();
        assert_eq!(message.sender_role, Role::Executor);
        assert_eq!(
            message.created_at,
            "2025-01-01T12:00:00Z".parse::<Timestamp>().unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_provisional_and_malformed() {
        let err = decode::<MessageRecord>(&message_json("local-msg-1-0")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::PersistenceFailure);

        let err = decode::<MessageRecord>(&json!({"id": "msg_1"})).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::PersistenceFailure);
    }

    #[test]
    fn test_project_positions_must_be_contiguous() {
        let payload = json!({
            "id": "prj_1",
            "client_id": "cli_1",
            "vehicle_id": "veh_1",
            "qr_code": "QR-1",
            "status": "pending",
            "progress": 0,
            "timeline": [{
                "id": "stp_1",
                "project_id": "prj_1",
                "position": 1,
                "title": "Check-in",
                "description": null,
                "status": "pending",
                "estimated_date": null,
                "completion_date": null,
                "notes": null,
                "updated_at": "2025-01-01T12:00:00Z"
            }],
            "start_date": null,
            "estimated_delivery": null,
            "actual_delivery": null,
            "created_at": "2025-01-01T12:00:00Z",
            "updated_at": "2025-01-01T12:00:00Z"
        });
        let err = decode::<ProjectRecord>(&payload).unwrap_err();
        assert!(err.to_string().contains("position 1 at index 0"));
    }
}
