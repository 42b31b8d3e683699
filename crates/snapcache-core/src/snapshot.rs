//! Snapshot encoding
//!
//! A snapshot is one immutable artifact per run: the capture timestamp plus,
//! for each collection in declared order, the kept record mapping. Encoding
//! is compact JSON with no extraneous whitespace and is byte-identical for
//! identical logical content, which both keeps the artifact small for
//! high-volume readers and makes runs reproducible in tests.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::client::JsonMap;
use crate::errors::{Result, RunError};
use crate::reader::ScanSet;

/// Top-level field holding the capture timestamp
pub const READ_AT_FIELD: &str = "readAt";

/// Read-optimized snapshot of the kept records for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    read_at: DateTime<Utc>,
    /// Kept mapping per collection, in declared (configured) order
    collections: Vec<(String, JsonMap)>,
}

impl Snapshot {
    /// Build a snapshot from the reader output and the capture timestamp.
    ///
    /// Collection order is taken from the scan set, which preserves the
    /// configured declaration order.
    pub fn new(read_at: DateTime<Utc>, scans: ScanSet) -> Self {
        let collections = scans
            .collections
            .into_iter()
            .map(|scan| (scan.name, scan.kept))
            .collect();
        Self {
            read_at,
            collections,
        }
    }

    /// Capture timestamp of this snapshot
    pub fn read_at(&self) -> &DateTime<Utc> {
        &self.read_at
    }

    /// Capture timestamp as the RFC3339 string embedded in the artifact
    pub fn read_at_rfc3339(&self) -> String {
        self.read_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Kept record mapping for a collection, if present
    pub fn collection(&self, name: &str) -> Option<&JsonMap> {
        self.collections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kept)| kept)
    }

    /// Serialize to the compact byte representation that gets published.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Encode` if a payload value cannot be represented;
    /// no partial artifact is ever emitted.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| RunError::Encode {
            message: e.to_string(),
        })
    }
}

impl Serialize for Snapshot {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1 + self.collections.len()))?;
        map.serialize_entry(READ_AT_FIELD, &self.read_at_rfc3339())?;
        for (name, kept) in &self.collections {
            map.serialize_entry(name, kept)?;
        }
        map.end()
    }
}
