//! The transfer state machine.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::core::{RESUME_INCOMPLETE, plan_chunks};
use crate::data::{
    Checkpoint, ChunkPlan, Progress, RESUME_MESSAGE, ResolvedSource, Session, TransferOptions,
    TransferOutcome, TransferPhase, TransferSpec,
};
use crate::effects::{
    ChunkReply, CheckpointStore, HttpClient, RangeFetchable, ResumableDestination,
    ResumableUploadable, Source,
};
use crate::error::{Error, Result};

/// State carried through the chunk loop; becomes a [`Checkpoint`] on suspension.
struct Run {
    spec: TransferSpec,
    source: ResolvedSource,
    plan: ChunkPlan,
    session: Session,
    next_chunk_index: usize,
    started_at: DateTime<Utc>,
}

impl From<Checkpoint> for Run {
    fn from(cp: Checkpoint) -> Self {
        Self {
            spec: cp.spec,
            source: cp.source,
            plan: cp.plan,
            session: cp.session,
            next_chunk_index: cp.next_chunk_index,
            started_at: cp.started_at,
        }
    }
}

/// Moves one object from a ranged source into a resumable-upload destination,
/// one chunk at a time, within a wall-clock budget per invocation.
///
/// At most one transfer is pending per checkpoint key: while a checkpoint
/// exists, [`Transfer::run`] resumes it and ignores any new spec.
pub struct Transfer<C: HttpClient, S: CheckpointStore> {
    client: C,
    store: S,
    options: TransferOptions,
}

impl<C: HttpClient, S: CheckpointStore> Transfer<C, S> {
    pub fn new(client: C, store: S) -> Self {
        Self {
            client,
            store,
            options: TransferOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The checkpoint a future [`Transfer::run`] would resume, if any.
    pub fn pending(&self) -> Result<Option<Checkpoint>> {
        self.store
            .get(&self.options.checkpoint_key)
            .map_err(|e| Error::Store(e.to_string()))?
            .map(|raw| Checkpoint::from_json(&raw))
            .transpose()
    }

    /// Drop the pending checkpoint. Returns whether there was one.
    pub fn discard(&self) -> Result<bool> {
        let existed = self.pending()?.is_some();
        self.clear_checkpoint()?;
        Ok(existed)
    }

    /// Start `spec`, or resume the pending transfer if there is one.
    ///
    /// Returns [`TransferOutcome::Suspended`] when the time budget runs out
    /// between chunks; call again to continue.
    pub async fn run(&self, spec: Option<TransferSpec>) -> Result<TransferOutcome> {
        let invoked_at = self.options.clock.now();
        let result = self.drive(spec, invoked_at).await;
        if let Err(ref e) = result {
            error!(error = %e, "transfer failed");
            self.report(Progress::phase(TransferPhase::Failed));
        }
        result
    }

    async fn drive(&self, spec: Option<TransferSpec>, invoked_at: DateTime<Utc>) -> Result<TransferOutcome> {
        let run = match self.pending()? {
            Some(checkpoint) => {
                if spec.is_some() {
                    warn!("a suspended transfer is pending; ignoring the supplied transfer spec");
                }
                info!(
                    next_chunk = checkpoint.next_chunk_index,
                    chunks = checkpoint.plan.len(),
                    "resuming suspended transfer"
                );
                Run::from(checkpoint)
            }
            None => {
                let spec = spec.ok_or_else(|| {
                    Error::Validation("no transfer is pending and no transfer spec was supplied".into())
                })?;
                self.start(spec, invoked_at).await?
            }
        };
        self.transfer(run, invoked_at).await
    }

    /// Resolve, plan and negotiate a fresh transfer.
    async fn start(&self, spec: TransferSpec, started_at: DateTime<Utc>) -> Result<Run> {
        spec.validate()?;
        let bearer = spec.bearer();

        self.report(Progress::phase(TransferPhase::Resolving));
        info!("resolving source");
        let source = Source::new(&self.client, &spec.source, bearer.clone(), &self.options.managed_files_url)?
            .probe(started_at)
            .await?;
        info!(
            mime_type = %source.mime_type,
            size = source.size_bytes,
            file_name = source.file_name.as_deref().unwrap_or(""),
            "resolved source"
        );

        self.report(Progress::phase(TransferPhase::Planning));
        let plan = plan_chunks(source.size_bytes, spec.config.chunk_size)?;
        info!(chunks = plan.len(), chunk_size = spec.config.chunk_size, "planned chunks");

        self.report(Progress::phase(TransferPhase::Negotiating));
        let session = ResumableDestination::new(&self.client, &spec.destination, bearer)
            .open_session(&source)
            .await?;
        debug!(location = %session.location, "opened upload session");

        Ok(Run {
            spec,
            source,
            plan,
            session,
            next_chunk_index: 0,
            started_at,
        })
    }

    /// Push chunks from the resume point until completion, suspension or failure.
    async fn transfer(&self, run: Run, invoked_at: DateTime<Utc>) -> Result<TransferOutcome> {
        let bearer = run.spec.bearer();
        let source = Source::new(&self.client, &run.spec.source, bearer.clone(), &self.options.managed_files_url)?;
        let destination = ResumableDestination::new(&self.client, &run.spec.destination, bearer);
        let total = run.source.size_bytes;
        let count = run.plan.len();

        self.report(self.progress(&run, run.next_chunk_index, run.plan.bytes_before(run.next_chunk_index)));

        if run.plan.is_empty() {
            info!("source is empty; finalizing zero-byte upload");
            return match destination.finalize_empty(&run.session).await? {
                ChunkReply::Complete(result) => self.complete(result, &run),
                ChunkReply::Continue => Err(Error::Transfer {
                    index: 0,
                    status: RESUME_INCOMPLETE,
                    body: "destination expects more data for a zero-byte object".into(),
                }),
            };
        }

        for (index, range) in run.plan.iter().enumerate().skip(run.next_chunk_index) {
            let range = *range;
            info!("chunk {}/{} ({range})", index + 1, count);

            let bytes = source.fetch_range(range).await?;
            debug!(bytes = bytes.len(), "downloaded {range}");

            match destination.upload_chunk(&run.session, index, range, total, bytes).await? {
                ChunkReply::Complete(result) => return self.complete(result, &run),
                ChunkReply::Continue => {
                    debug!("destination expects the next chunk");
                    self.report(self.progress(&run, index, range.end + 1));
                }
            }

            let elapsed = (self.options.clock.now() - invoked_at).to_std().unwrap_or_default();
            if elapsed > run.spec.config.time_budget && index + 1 < count {
                return self.suspend(&run, index + 1);
            }
        }

        Err(Error::Transfer {
            index: count - 1,
            status: RESUME_INCOMPLETE,
            body: format!("destination still expects data after all {count} chunks"),
        })
    }

    fn complete(&self, result: Value, run: &Run) -> Result<TransferOutcome> {
        // The object already exists at the destination.
        if let Err(e) = self.clear_checkpoint() {
            error!(error = %e, "upload complete but the checkpoint could not be removed");
        }
        info!("upload complete");
        let count = run.plan.len();
        self.report(Progress {
            phase: TransferPhase::Completed,
            chunk_index: count.saturating_sub(1),
            chunk_count: count,
            bytes_transferred: run.source.size_bytes,
            total_bytes: Some(run.source.size_bytes),
        });
        Ok(TransferOutcome::Completed(result))
    }

    fn suspend(&self, run: &Run, next_chunk_index: usize) -> Result<TransferOutcome> {
        let checkpoint = Checkpoint {
            spec: run.spec.clone(),
            source: run.source.clone(),
            plan: run.plan.clone(),
            session: run.session.clone(),
            next_chunk_index,
            started_at: run.started_at,
            suspended_at: self.options.clock.now(),
        };
        self.store
            .set(&self.options.checkpoint_key, &checkpoint.to_json()?)
            .map_err(|e| Error::Store(e.to_string()))?;

        warn!(
            next_chunk = next_chunk_index,
            chunks = run.plan.len(),
            "time budget exhausted; {RESUME_MESSAGE}"
        );
        let mut progress = self.progress(run, next_chunk_index, run.plan.bytes_before(next_chunk_index));
        progress.phase = TransferPhase::Suspended;
        self.report(progress);

        Ok(TransferOutcome::Suspended {
            message: RESUME_MESSAGE.to_string(),
            next_chunk_index,
            chunk_count: run.plan.len(),
        })
    }

    fn clear_checkpoint(&self) -> Result<()> {
        self.store
            .delete(&self.options.checkpoint_key)
            .map_err(|e| Error::Store(e.to_string()))
    }

    fn progress(&self, run: &Run, chunk_index: usize, bytes_transferred: u64) -> Progress {
        Progress {
            phase: TransferPhase::Transferring,
            chunk_index,
            chunk_count: run.plan.len(),
            bytes_transferred,
            total_bytes: Some(run.source.size_bytes),
        }
    }

    fn report(&self, progress: Progress) {
        if let Some(ref callback) = self.options.on_progress {
            callback(&progress);
        }
    }
}
