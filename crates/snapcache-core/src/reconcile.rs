//! Post-publish reconciliation
//!
//! Applies write-back mutations to the record store for every pair produced
//! during the read phase: hard deletes for retired records, or a capture
//! timestamp stamped onto every kept record, depending on the configured
//! policy. Mutations are independent and idempotent, so they run with
//! bounded fan-out and a failure on one record never blocks the others.

use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{JsonMap, RecordStore};

/// Configuration-selected write-back policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Physically remove every record that was excluded as retired
    DeleteRetired,
    /// Write the capture timestamp onto every kept record, leaving retired
    /// records untouched in the store
    StampKept {
        /// Field name the timestamp is written to
        field: String,
    },
}

/// One record that could not be reconciled.
///
/// Safe to retry on the next scheduled run since both policies are
/// idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileFailure {
    pub collection: String,
    pub id: String,
    pub message: String,
}

/// Aggregated outcome of the reconciliation stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of mutations issued
    pub attempted: usize,
    /// Records still needing reconciliation
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    /// True when every mutation succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply one write-back mutation per (collection, id) pair.
///
/// Runs at most `concurrency` mutations in flight at once (a floor of 1 is
/// applied). Per-record failures are collected into the report rather than
/// propagated: the snapshot is already published and stays valid.
pub async fn reconcile(
    store: &dyn RecordStore,
    policy: &ReconcilePolicy,
    pairs: Vec<(String, String)>,
    read_at: &DateTime<Utc>,
    concurrency: usize,
) -> ReconcileReport {
    let attempted = pairs.len();
    let stamp_fields = match policy {
        ReconcilePolicy::DeleteRetired => None,
        ReconcilePolicy::StampKept { field } => {
            let mut fields = JsonMap::new();
            fields.insert(
                field.clone(),
                Value::String(read_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
            Some(fields)
        }
    };

    let failures: Vec<ReconcileFailure> = stream::iter(pairs)
        .map(|(collection, id)| {
            let stamp_fields = stamp_fields.clone();
            async move {
                let outcome = match &stamp_fields {
                    None => store.delete(&collection, &id).await,
                    Some(fields) => store.update(&collection, &id, fields.clone()).await,
                };
                match outcome {
                    Ok(()) => {
                        debug!(collection = %collection, id = %id, "reconciled record");
                        None
                    }
                    Err(e) => {
                        warn!(
                            collection = %collection,
                            id = %id,
                            error = %e,
                            "reconciliation failed; pair is safe to retry next run"
                        );
                        Some(ReconcileFailure {
                            collection,
                            id,
                            message: e.to_string(),
                        })
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|failure| async move { failure })
        .collect()
        .await;

    ReconcileReport {
        attempted,
        failures,
    }
}
