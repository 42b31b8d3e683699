//! Collection reader
//!
//! Streams every record from the configured collections and partitions them
//! into the kept mapping (snapshot-bound) and the retired id list
//! (reconciliation-bound). Kept payloads are passed through unmodified
//! except for one normalization: the mutation-timestamp field is stripped,
//! since it is store-internal bookkeeping and not snapshot-visible data.

use serde_json::Value;
use tracing::debug;

use crate::client::{JsonMap, RecordStore};
use crate::errors::{Result, RunError};

/// Default name of the boolean retirement marker field
pub const DEFAULT_RETIRED_FIELD: &str = "deleted";

/// Default name of the store-internal mutation timestamp field
pub const DEFAULT_TIMESTAMP_FIELD: &str = "updatedAt";

/// Names of the two reserved control fields recognized during reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Boolean marker: present and `true` means the record is retired
    pub retired_field: String,
    /// Mutation timestamp field, stripped from kept payloads
    pub timestamp_field: String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            retired_field: DEFAULT_RETIRED_FIELD.to_string(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
        }
    }
}

/// Read result for a single collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionScan {
    /// Collection name
    pub name: String,
    /// Kept records: id to cleaned payload (always a JSON object)
    pub kept: JsonMap,
    /// Ids of records excluded because their retirement marker was true
    pub retired: Vec<String>,
}

/// Read results for every configured collection, in declared order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSet {
    pub collections: Vec<CollectionScan>,
}

impl ScanSet {
    /// Total number of kept records across all collections
    pub fn kept_count(&self) -> usize {
        self.collections.iter().map(|c| c.kept.len()).sum()
    }

    /// Total number of retired records across all collections
    pub fn retired_count(&self) -> usize {
        self.collections.iter().map(|c| c.retired.len()).sum()
    }

    /// (collection, id) pairs removed from the snapshot as retired.
    ///
    /// Consumed by the delete-retired reconciliation policy.
    pub fn retirement_batch(&self) -> Vec<(String, String)> {
        self.collections
            .iter()
            .flat_map(|c| c.retired.iter().map(|id| (c.name.clone(), id.clone())))
            .collect()
    }

    /// (collection, id) pairs that were kept in the snapshot.
    ///
    /// Consumed by the stamp-kept reconciliation policy.
    pub fn stamp_batch(&self) -> Vec<(String, String)> {
        self.collections
            .iter()
            .flat_map(|c| c.kept.keys().map(|id| (c.name.clone(), id.clone())))
            .collect()
    }
}

/// Whether a payload carries a retirement marker set to `true`.
///
/// Absent markers and non-boolean values both mean the record is live.
fn is_retired(payload: &JsonMap, retired_field: &str) -> bool {
    payload
        .get(retired_field)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Read every configured collection and partition records into kept/retired.
///
/// Collections are read in declared order. A listing failure on any
/// collection fails the whole run: a partial snapshot is never produced.
///
/// # Errors
///
/// Returns `RunError::CollectionRead` if any collection cannot be listed.
pub async fn read_collections(
    store: &dyn RecordStore,
    names: &[String],
    options: &ReadOptions,
) -> Result<ScanSet> {
    let mut collections = Vec::with_capacity(names.len());

    for name in names {
        let records = store
            .list(name)
            .await
            .map_err(|e| RunError::CollectionRead {
                collection: name.clone(),
                message: e.to_string(),
            })?;

        let mut scan = CollectionScan {
            name: name.clone(),
            ..CollectionScan::default()
        };

        for (id, mut payload) in records {
            if is_retired(&payload, &options.retired_field) {
                scan.retired.push(id);
                continue;
            }
            payload.remove(&options.timestamp_field);
            scan.kept.insert(id, Value::Object(payload));
        }

        debug!(
            collection = %name,
            kept = scan.kept.len(),
            retired = scan.retired.len(),
            "scanned collection"
        );
        collections.push(scan);
    }

    Ok(ScanSet { collections })
}
