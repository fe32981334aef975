use serde_json::{Value, json};

/// Message returned when a run stops early and must be invoked again.
pub const RESUME_MESSAGE: &str = "There is the next upload chunk. So, please run the script again.";

/// Terminal value of one invocation.
///
/// `Suspended` is not an error: the checkpoint is in the store and the next
/// invocation picks it up.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The destination accepted the last chunk and returned its metadata.
    Completed(Value),
    /// The time budget ran out between chunks.
    Suspended {
        message: String,
        next_chunk_index: usize,
        chunk_count: usize,
    },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }

    /// The destination's object on completion, `{"message": ...}` on suspension.
    pub fn into_json(self) -> Value {
        match self {
            Self::Completed(value) => value,
            Self::Suspended { message, .. } => json!({ "message": message }),
        }
    }
}
