//! Immutable data types for transfers.
//!
//! Specs, plans, checkpoints and outcomes are plain values: they are built
//! once, passed by reference, and replaced rather than mutated.

pub mod checkpoint;
pub mod options;
pub mod outcome;
pub mod plan;
pub mod spec;

pub use checkpoint::{CHECKPOINT_KEY, Checkpoint, ResolvedSource, Session};
pub use options::{DEFAULT_MANAGED_FILES_URL, Progress, TransferOptions, TransferPhase};
pub use outcome::{RESUME_MESSAGE, TransferOutcome};
pub use plan::{ByteRange, ChunkPlan};
pub use spec::{
    DEFAULT_CHUNK_SIZE, DEFAULT_TIME_BUDGET, DestinationDescriptor, SourceDescriptor,
    TransferConfig, TransferSpec,
};
