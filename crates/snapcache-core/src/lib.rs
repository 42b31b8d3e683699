//! Snapcache Core - Snapshot-and-reconcile pipeline
//!
//! This crate provides the stages of a snapshot run against a remote
//! document store:
//! - Client traits for the record store and the snapshot sink
//! - Collection reader with retirement filtering and field normalization
//! - Deterministic compact snapshot encoding
//! - Atomic publish of the encoded artifact under a well-known name
//! - Concurrent post-publish reconciliation (delete-retired or stamp-kept)
//! - Run orchestrator sequencing the stages with a strict ordering contract
//!
//! All stages take their collaborators as explicit dependencies so they can
//! be exercised against in-memory implementations without network access.

pub mod client;
pub mod errors;
pub mod logging;
pub mod publish;
pub mod reader;
pub mod reconcile;
pub mod run;
pub mod snapshot;

// Re-export commonly used types
pub use client::{ClientError, JsonMap, RecordStore, SnapshotSink};
pub use errors::{Result, RunError};
pub use reader::{read_collections, CollectionScan, ReadOptions, ScanSet};
pub use reconcile::{ReconcileFailure, ReconcilePolicy, ReconcileReport};
pub use run::{Orchestrator, RunOptions, RunPhase, RunReport};
pub use snapshot::Snapshot;
