use std::fmt;
use std::sync::Arc;

use super::checkpoint::CHECKPOINT_KEY;
use crate::effects::clock::{Clock, SystemClock};

/// Files endpoint of the managed storage provider.
pub const DEFAULT_MANAGED_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// Phases of a transfer.
///
/// A fresh run goes Idle → Resolving → Planning → Negotiating → Transferring
/// and ends in one of Completed, Suspended or Failed. A resumed run jumps
/// straight from Idle to Transferring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPhase {
    #[default]
    Idle,
    /// Probing the source for size and type.
    Resolving,
    /// Partitioning the source into chunks.
    Planning,
    /// Opening the upload session.
    Negotiating,
    /// Moving chunks.
    Transferring,
    Completed,
    Suspended,
    Failed,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferPhase::Idle => "Idle",
            TransferPhase::Resolving => "Resolving",
            TransferPhase::Planning => "Planning",
            TransferPhase::Negotiating => "Negotiating",
            TransferPhase::Transferring => "Transferring",
            TransferPhase::Completed => "Completed",
            TransferPhase::Suspended => "Suspended",
            TransferPhase::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub phase: TransferPhase,
    /// Index of the chunk just handled (or about to be, before the first one).
    pub chunk_index: usize,
    pub chunk_count: usize,
    /// Bytes the destination has acknowledged so far.
    pub bytes_transferred: u64,
    /// Object size, once the source has been resolved.
    pub total_bytes: Option<u64>,
}

impl Progress {
    pub(crate) fn phase(phase: TransferPhase) -> Self {
        Self {
            phase,
            chunk_index: 0,
            chunk_count: 0,
            bytes_transferred: 0,
            total_bytes: None,
        }
    }

    pub fn percentage(&self) -> Option<f32> {
        self.total_bytes.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.bytes_transferred as f32 / total as f32) * 100.0
            }
        })
    }
}

/// Engine-level settings that are not part of a transfer spec.
#[derive(Clone)]
pub struct TransferOptions {
    /// Key the checkpoint lives under. Default: `"next"`.
    pub checkpoint_key: String,

    /// Files endpoint used to resolve and download managed files.
    pub managed_files_url: String,

    /// Time source for the budget check.
    pub clock: Arc<dyn Clock>,

    /// Invoked on phase transitions and after every chunk.
    pub on_progress: Option<Arc<dyn Fn(&Progress) + Send + Sync>>,
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("checkpoint_key", &self.checkpoint_key)
            .field("managed_files_url", &self.managed_files_url)
            .field("on_progress", &"{ ... }")
            .finish()
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            checkpoint_key: CHECKPOINT_KEY.to_string(),
            managed_files_url: DEFAULT_MANAGED_FILES_URL.to_string(),
            clock: Arc::new(SystemClock),
            on_progress: None,
        }
    }
}

impl TransferOptions {
    #[must_use]
    pub fn checkpoint_key(mut self, key: impl Into<String>) -> Self {
        self.checkpoint_key = key.into();
        self
    }

    #[must_use]
    pub fn managed_files_url(mut self, url: impl Into<String>) -> Self {
        self.managed_files_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the progress callback.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ferry_transfer::{TransferOptions, TransferPhase};
    ///
    /// let options = TransferOptions::default().on_progress(Arc::new(|p: &ferry_transfer::Progress| {
    ///     if p.phase == TransferPhase::Transferring {
    ///         println!("chunk {}/{}", p.chunk_index + 1, p.chunk_count);
    ///     }
    /// }));
    /// ```
    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}
