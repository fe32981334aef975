//! Checkpointed chunked transfer from ranged sources to resumable-upload
//! destinations.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable specs, plans, checkpoints and outcomes
//! - [`core`] - Pure transformations
//! - [`effects`] - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Bounded memory**: at most one chunk is held at a time
//! - **Time budget**: a run suspends between chunks once its budget is spent
//!   and persists a [`Checkpoint`]; the next run continues from there
//! - **Mechanism-only**: HTTP, storage and time are injected traits, so the
//!   engine runs unchanged against scripted doubles

pub mod core;
pub mod data;
pub mod effects;
mod engine;
mod error;

pub use core::{parse_query_parameters, plan_chunks};
pub use data::{
    ByteRange, Checkpoint, ChunkPlan, DestinationDescriptor, Progress, ResolvedSource, Session,
    SourceDescriptor, TransferConfig, TransferOptions, TransferOutcome, TransferPhase,
    TransferSpec,
};
pub use effects::{CheckpointStore, Clock, HttpClient, MemoryStore, SystemClock};
pub use engine::Transfer;

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{Error, Result};
