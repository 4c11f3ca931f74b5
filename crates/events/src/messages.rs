//! Wire contracts for the preprocessing and comparison workers.
//!
//! Outbound job-start messages serialize with the camelCase field names
//! the worker fleet expects. Inbound results arrive as loosely-typed
//! JSON (`status` / `job_id` / `payload`); [`decode_preprocess_result`]
//! and [`decode_comparison_result`] are the single validating boundary
//! that turns them into typed values; everything past this module
//! operates on the variants, never on raw maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use lascmp_core::geometry::{BoundingBox, GridSpec};
use lascmp_core::types::DbId;

// ---------------------------------------------------------------------------
// Outbound job-start messages
// ---------------------------------------------------------------------------

/// A bucket/key reference into object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRef {
    pub bucket: String,
    pub object_key: String,
}

/// Start one preprocessing job: one file, its unclaimed regions, the
/// grid to bin against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPreprocessJob {
    pub job_id: Uuid,
    pub comparison_id: DbId,
    pub file_id: DbId,
    pub file: StorageRef,
    pub regions: Vec<BoundingBox>,
    pub grid: GridSpec,
}

/// One preprocessed input to the comparison worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonInputFile {
    pub bucket: String,
    pub object_key: String,
    pub group_name: String,
}

/// Start the final comparison job over every preprocessed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartComparisonJob {
    pub job_id: Uuid,
    pub comparison_id: DbId,
    pub files: Vec<ComparisonInputFile>,
}

// ---------------------------------------------------------------------------
// Inbound worker results
// ---------------------------------------------------------------------------

/// What the worker reported for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The job succeeded and produced an artifact at this location.
    Success(StorageRef),
    /// The job failed; `reason` is the worker-supplied message.
    Failure { reason: String },
}

/// A validated preprocessing result.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    pub job_id: Uuid,
    pub comparison_id: DbId,
    pub file_id: DbId,
    pub outcome: WorkerOutcome,
}

/// A validated comparison result.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub job_id: Uuid,
    pub comparison_id: DbId,
    pub outcome: WorkerOutcome,
}

/// A result message that cannot be attributed safely is rejected here
/// and must not mutate any entity.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Result message missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Fallback reason when a worker reports failure without a message.
const UNSPECIFIED_FAILURE: &str = "Worker reported failure without a message";

/// Reason used when a success result carries no artifact location.
const MISSING_LOCATION: &str = "Result message missing storage location";

/// Decode a preprocessing result message.
pub fn decode_preprocess_result(value: &Value) -> Result<PreprocessResult, DecodeError> {
    let (job_id, status, payload) = decode_envelope(value)?;
    let comparison_id = decode_entity_id(payload, "comparisonId")?;
    let file_id = decode_entity_id(payload, "fileId")?;
    Ok(PreprocessResult {
        job_id,
        comparison_id,
        file_id,
        outcome: decode_outcome(status, payload),
    })
}

/// Decode a comparison result message.
pub fn decode_comparison_result(value: &Value) -> Result<ComparisonResult, DecodeError> {
    let (job_id, status, payload) = decode_envelope(value)?;
    let comparison_id = decode_entity_id(payload, "comparisonId")?;
    Ok(ComparisonResult {
        job_id,
        comparison_id,
        outcome: decode_outcome(status, payload),
    })
}

/// Validate the `status` / `job_id` / `payload` envelope shared by both
/// result streams.
fn decode_envelope(value: &Value) -> Result<(Uuid, &str, &Value), DecodeError> {
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("status"))?;
    let job_id_raw = value
        .get("job_id")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("job_id"))?;
    let job_id = Uuid::parse_str(job_id_raw)
        .map_err(|_| DecodeError::InvalidJobId(job_id_raw.to_string()))?;
    let payload = value
        .get("payload")
        .filter(|p| p.is_object())
        .ok_or(DecodeError::MissingField("payload"))?;
    Ok((job_id, status, payload))
}

/// Entity ids arrive as JSON numbers or numeric strings depending on
/// the worker; accept both.
fn decode_entity_id(payload: &Value, field: &'static str) -> Result<DbId, DecodeError> {
    match payload.get(field) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| DecodeError::InvalidValue {
            field,
            value: n.to_string(),
        }),
        Some(Value::String(s)) => s.parse().map_err(|_| DecodeError::InvalidValue {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(DecodeError::InvalidValue {
            field,
            value: other.to_string(),
        }),
        None => Err(DecodeError::MissingField(field)),
    }
}

/// Map the status string plus optional `result` / `msg` payload fields
/// onto a [`WorkerOutcome`].
///
/// A success without a storage location is treated as a failure rather
/// than a malformed message: the job is attributable, and dropping it
/// would leave the file hanging until the timeout sweep.
fn decode_outcome(status: &str, payload: &Value) -> WorkerOutcome {
    if !status.eq_ignore_ascii_case("success") {
        let reason = payload
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or(UNSPECIFIED_FAILURE)
            .to_string();
        return WorkerOutcome::Failure { reason };
    }

    let location = payload.get("result").and_then(|r| {
        let bucket = r.get("bucket").and_then(Value::as_str)?;
        let object_key = r.get("objectKey").and_then(Value::as_str)?;
        Some(StorageRef {
            bucket: bucket.to_string(),
            object_key: object_key.to_string(),
        })
    });

    match location {
        Some(location) => WorkerOutcome::Success(location),
        None => WorkerOutcome::Failure {
            reason: MISSING_LOCATION.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn success_message(job_id: Uuid) -> Value {
        json!({
            "status": "success",
            "job_id": job_id.to_string(),
            "payload": {
                "comparisonId": 11,
                "fileId": 3,
                "result": { "bucket": "preprocessed", "objectKey": "11/3.laz" }
            }
        })
    }

    #[test]
    fn decodes_successful_preprocess_result() {
        let job_id = Uuid::new_v4();
        let result = decode_preprocess_result(&success_message(job_id)).unwrap();
        assert_eq!(result.job_id, job_id);
        assert_eq!(result.comparison_id, 11);
        assert_eq!(result.file_id, 3);
        assert_eq!(
            result.outcome,
            WorkerOutcome::Success(StorageRef {
                bucket: "preprocessed".to_string(),
                object_key: "11/3.laz".to_string(),
            })
        );
    }

    #[test]
    fn decodes_failure_with_worker_message() {
        let msg = json!({
            "status": "error",
            "job_id": Uuid::new_v4().to_string(),
            "payload": { "comparisonId": 11, "fileId": 3, "msg": "corrupt LAS header" }
        });
        let result = decode_preprocess_result(&msg).unwrap();
        assert_matches!(
            result.outcome,
            WorkerOutcome::Failure { reason } if reason == "corrupt LAS header"
        );
    }

    #[test]
    fn failure_without_message_gets_fallback_reason() {
        let msg = json!({
            "status": "error",
            "job_id": Uuid::new_v4().to_string(),
            "payload": { "comparisonId": 11, "fileId": 3 }
        });
        let result = decode_preprocess_result(&msg).unwrap();
        assert_matches!(result.outcome, WorkerOutcome::Failure { .. });
    }

    #[test]
    fn success_without_location_becomes_failure() {
        let msg = json!({
            "status": "success",
            "job_id": Uuid::new_v4().to_string(),
            "payload": { "comparisonId": 11, "fileId": 3 }
        });
        let result = decode_preprocess_result(&msg).unwrap();
        assert_matches!(result.outcome, WorkerOutcome::Failure { .. });
    }

    #[test]
    fn missing_envelope_fields_are_rejected() {
        let job_id = Uuid::new_v4();
        for field in ["status", "job_id", "payload"] {
            let mut msg = success_message(job_id);
            msg.as_object_mut().unwrap().remove(field);
            let err = decode_preprocess_result(&msg).unwrap_err();
            assert_matches!(err, DecodeError::MissingField(f) if f == field);
        }
    }

    #[test]
    fn preprocess_result_requires_file_id() {
        let mut msg = success_message(Uuid::new_v4());
        msg["payload"].as_object_mut().unwrap().remove("fileId");
        assert_matches!(
            decode_preprocess_result(&msg).unwrap_err(),
            DecodeError::MissingField("fileId")
        );
        // The comparison stream has no fileId and must still decode.
        assert!(decode_comparison_result(&msg).is_ok());
    }

    #[test]
    fn garbage_job_id_is_rejected() {
        let mut msg = success_message(Uuid::new_v4());
        msg["job_id"] = json!("not-a-uuid");
        assert_matches!(
            decode_preprocess_result(&msg).unwrap_err(),
            DecodeError::InvalidJobId(_)
        );
    }

    #[test]
    fn entity_ids_accept_numeric_strings() {
        let mut msg = success_message(Uuid::new_v4());
        msg["payload"]["comparisonId"] = json!("42");
        let result = decode_comparison_result(&msg).unwrap();
        assert_eq!(result.comparison_id, 42);
    }

    #[test]
    fn start_preprocess_job_serializes_camel_case() {
        let job = StartPreprocessJob {
            job_id: Uuid::nil(),
            comparison_id: 1,
            file_id: 2,
            file: StorageRef {
                bucket: "basebucket".to_string(),
                object_key: "scan.laz".to_string(),
            },
            regions: vec![BoundingBox::new(0.0, 10.0, 0.0, 10.0).unwrap()],
            grid: GridSpec {
                cell_width: 1.0,
                cell_height: 1.0,
                origin_x: 0.0,
                origin_y: 0.0,
            },
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["comparisonId"], 1);
        assert_eq!(value["fileId"], 2);
        assert_eq!(value["file"]["objectKey"], "scan.laz");
        assert_eq!(value["regions"][0]["xMin"], 0.0);
        assert_eq!(value["grid"]["cellWidth"], 1.0);
    }
}
