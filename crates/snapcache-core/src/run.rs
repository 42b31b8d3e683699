//! Run orchestrator
//!
//! Sequences one job: read, encode, publish, reconcile. Stages are strictly
//! sequential because each depends on the complete output of the previous
//! one; the only internal concurrency lives inside the reconciler. The one
//! ordering rule that must never break: no reconciliation mutation is issued
//! before the publish acknowledgment is received.

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::client::{RecordStore, SnapshotSink};
use crate::errors::{Result, RunError};
use crate::publish::{attachment_disposition, publish, DEFAULT_OBJECT_NAME};
use crate::reader::{read_collections, ReadOptions};
use crate::reconcile::{reconcile, ReconcilePolicy, ReconcileReport};
use crate::snapshot::Snapshot;

/// Default bound on in-flight reconciliation mutations
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Phase of a single run.
///
/// `Failed` is terminal and reachable from `Reading`, `Encoding`, or
/// `Publishing` only; reconciliation failures are partial by design and end
/// the run in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Reading,
    Encoding,
    Publishing,
    Reconciling,
    Done,
    Failed,
}

impl RunPhase {
    /// Stable label used in structured logs
    pub fn label(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Reading => "reading",
            RunPhase::Encoding => "encoding",
            RunPhase::Publishing => "publishing",
            RunPhase::Reconciling => "reconciling",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }
}

/// Everything a run needs besides its two collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Ordered collection names to capture
    pub collections: Vec<String>,
    /// Artifact name at the sink
    pub object_name: String,
    /// Attach a content-disposition download hint to the publish
    pub as_attachment: bool,
    /// Write-back policy applied after a successful publish
    pub policy: ReconcilePolicy,
    /// Bound on in-flight reconciliation mutations
    pub concurrency: usize,
    /// Reserved control field names
    pub read: ReadOptions,
    /// Stop after encoding: no publish, no reconciliation
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(collections: Vec<String>) -> Self {
        Self {
            collections,
            object_name: DEFAULT_OBJECT_NAME.to_string(),
            as_attachment: true,
            policy: ReconcilePolicy::DeleteRetired,
            concurrency: DEFAULT_CONCURRENCY,
            read: ReadOptions::default(),
            dry_run: false,
        }
    }
}

/// Outcome summary of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Unique run identifier (UUIDv7, also present in every log line)
    pub run_id: String,
    /// Capture timestamp embedded in the artifact
    pub read_at: DateTime<Utc>,
    /// Records kept in the snapshot
    pub kept: usize,
    /// Records excluded as retired
    pub retired: usize,
    /// Size of the encoded artifact
    pub artifact_bytes: usize,
    /// False only for dry runs
    pub published: bool,
    /// Present unless the run was a dry run
    pub reconcile: Option<ReconcileReport>,
}

impl RunReport {
    /// True when nothing is left to reconcile
    pub fn is_clean(&self) -> bool {
        self.reconcile.as_ref().map(|r| r.is_clean()).unwrap_or(true)
    }
}

/// Single-use orchestrator: performs exactly one run, then terminates.
pub struct Orchestrator<'a> {
    records: &'a dyn RecordStore,
    sink: &'a dyn SnapshotSink,
    options: RunOptions,
    phase: RunPhase,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        records: &'a dyn RecordStore,
        sink: &'a dyn SnapshotSink,
        options: RunOptions,
    ) -> Self {
        Self {
            records,
            sink,
            options,
            phase: RunPhase::Idle,
        }
    }

    /// Current phase (exposed for state assertions in tests)
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase, run_id: &str) {
        self.phase = phase;
        info!(run_id = %run_id, phase = phase.label(), "run phase");
    }

    fn fail(&mut self, run_id: &str, err: RunError) -> RunError {
        self.phase = RunPhase::Failed;
        error!(
            run_id = %run_id,
            stage = err.stage(),
            error = %err,
            "run failed; no reconciliation was issued for this snapshot"
        );
        err
    }

    /// Execute the run: read, encode, publish, reconcile.
    ///
    /// Reconciliation only starts once the publish has been acknowledged; on
    /// any fatal stage error nothing in the record store has been mutated and
    /// the run is safe to repeat from scratch.
    ///
    /// # Errors
    ///
    /// Returns the fatal `RunError` of whichever stage aborted the run.
    /// Per-record reconciliation failures do not error the call; they are
    /// reported in the returned [`RunReport`].
    pub async fn run(mut self) -> Result<RunReport> {
        let run_id = Uuid::now_v7().to_string();
        let read_at = Utc::now();

        self.enter(RunPhase::Reading, &run_id);
        let scans = match read_collections(self.records, &self.options.collections, &self.options.read).await
        {
            Ok(scans) => scans,
            Err(e) => return Err(self.fail(&run_id, e)),
        };
        let kept = scans.kept_count();
        let retired = scans.retired_count();
        let pairs = match &self.options.policy {
            ReconcilePolicy::DeleteRetired => scans.retirement_batch(),
            ReconcilePolicy::StampKept { .. } => scans.stamp_batch(),
        };

        self.enter(RunPhase::Encoding, &run_id);
        let snapshot = Snapshot::new(read_at, scans);
        let bytes = match snapshot.encode() {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(&run_id, e)),
        };

        if self.options.dry_run {
            self.phase = RunPhase::Done;
            info!(
                run_id = %run_id,
                kept,
                retired,
                artifact_bytes = bytes.len(),
                "dry run complete; nothing published or reconciled"
            );
            return Ok(RunReport {
                run_id,
                read_at,
                kept,
                retired,
                artifact_bytes: bytes.len(),
                published: false,
                reconcile: None,
            });
        }

        self.enter(RunPhase::Publishing, &run_id);
        let disposition = self
            .options
            .as_attachment
            .then(|| attachment_disposition(&self.options.object_name));
        if let Err(e) = publish(
            self.sink,
            &self.options.object_name,
            &bytes,
            disposition.as_deref(),
        )
        .await
        {
            return Err(self.fail(&run_id, e));
        }

        self.enter(RunPhase::Reconciling, &run_id);
        let report = reconcile(
            self.records,
            &self.options.policy,
            pairs,
            &read_at,
            self.options.concurrency,
        )
        .await;

        self.phase = RunPhase::Done;
        info!(
            run_id = %run_id,
            kept,
            retired,
            reconciled = report.attempted - report.failures.len(),
            reconcile_failures = report.failures.len(),
            "run complete"
        );

        Ok(RunReport {
            run_id,
            read_at,
            kept,
            retired,
            artifact_bytes: bytes.len(),
            published: true,
            reconcile: Some(report),
        })
    }
}
