use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::ChunkPlan;
use super::spec::TransferSpec;
use crate::error::{Error, Result};

/// Store key the engine uses when none is configured.
pub const CHECKPOINT_KEY: &str = "next";

/// Facts about the source learned by probing it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// An open resumable-upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub location: String,
}

/// Everything needed to continue a suspended transfer at the right chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub spec: TransferSpec,
    pub source: ResolvedSource,
    pub plan: ChunkPlan,
    pub session: Session,
    pub next_chunk_index: usize,
    pub started_at: DateTime<Utc>,
    pub suspended_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Checkpoint)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let checkpoint: Self = serde_json::from_str(raw).map_err(Error::Checkpoint)?;
        if !checkpoint.plan.partitions(checkpoint.source.size_bytes) {
            return Err(Error::Validation(format!(
                "checkpoint plan does not cover a {}-byte object in order",
                checkpoint.source.size_bytes
            )));
        }
        if checkpoint.next_chunk_index > checkpoint.plan.len() {
            return Err(Error::Validation(format!(
                "checkpoint resumes at chunk {} of a {}-chunk plan",
                checkpoint.next_chunk_index,
                checkpoint.plan.len()
            )));
        }
        Ok(checkpoint)
    }

    pub fn remaining_chunks(&self) -> usize {
        self.plan.len() - self.next_chunk_index
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.plan.bytes_before(self.next_chunk_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DestinationDescriptor, SourceDescriptor};
    use crate::plan_chunks;
    use chrono::TimeZone;
    use serde_json::{Value, json};

    fn checkpoint() -> Checkpoint {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Checkpoint {
            spec: TransferSpec::new(
                SourceDescriptor::remote("https://cdn.example.com/a.bin"),
                DestinationDescriptor::new("https://upload.example.com/f?uploadType=resumable", json!({})),
            ),
            source: ResolvedSource {
                mime_type: "video/mp4".into(),
                size_bytes: 40,
                file_name: None,
            },
            plan: plan_chunks(40, 16).unwrap(),
            session: Session {
                location: "https://upload.example.com/session/1".into(),
            },
            next_chunk_index: 1,
            started_at: at,
            suspended_at: at,
        }
    }

    fn tampered(edit: impl FnOnce(&mut Value)) -> String {
        let mut value = serde_json::to_value(checkpoint()).unwrap();
        edit(&mut value);
        value.to_string()
    }

    #[test]
    fn stored_record_restores() {
        let cp = checkpoint();
        let back = Checkpoint::from_json(&cp.to_json().unwrap()).unwrap();
        assert_eq!(back, cp);
        assert_eq!(back.remaining_chunks(), 2);
        assert_eq!(back.bytes_transferred(), 16);
    }

    #[test]
    fn resume_index_past_plan_is_rejected() {
        let raw = tampered(|v| v["next_chunk_index"] = json!(4));
        assert!(matches!(Checkpoint::from_json(&raw), Err(Error::Validation(_))));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let raw = tampered(|v| v["plan"][1] = json!([500, 10]));
        assert!(matches!(Checkpoint::from_json(&raw), Err(Error::Validation(_))));
    }

    #[test]
    fn plan_not_matching_size_is_rejected() {
        let raw = tampered(|v| v["source"]["size_bytes"] = json!(41));
        assert!(matches!(Checkpoint::from_json(&raw), Err(Error::Validation(_))));
    }

    #[test]
    fn garbage_is_corrupt() {
        assert!(matches!(Checkpoint::from_json("{not json"), Err(Error::Checkpoint(_))));
    }
}
