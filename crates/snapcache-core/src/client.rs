//! Client traits for the two external collaborators
//!
//! The record store holds the authoritative mutable records; the snapshot
//! sink serves the published artifact to readers. Both are consumed behind
//! traits so every pipeline stage can run against in-memory implementations.

use async_trait::async_trait;
use thiserror::Error;

/// Schema-less record payload: field name to JSON value.
///
/// `serde_json::Map` is ordered by key (BTree-backed), which is what makes
/// the snapshot encoding deterministic without an extra canonicalization
/// pass.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Error surfaced by a client implementation.
///
/// Stages wrap this into the run-level taxonomy at the stage boundary, so
/// the client layer only needs to say which operation failed and why.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{op}: {message}")]
pub struct ClientError {
    /// Client operation that failed ("list", "delete", "update", "put")
    pub op: &'static str,
    pub message: String,
}

impl ClientError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// Authoritative document store holding the source-of-truth records.
///
/// `delete` and `update` must be idempotent per id: deleting an id that is
/// already gone and re-applying the same update both succeed. The reconciler
/// relies on this to make failed runs safely retryable.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every record in the named collection as (id, payload) pairs.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the listing cannot be completed; partial
    /// listings must not be returned.
    async fn list(&self, collection: &str) -> Result<Vec<(String, JsonMap)>, ClientError>;

    /// Physically remove a record. Deleting a missing id is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or store failures only.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError>;

    /// Merge the given fields into a record. Updating a missing id is a
    /// no-op success.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport or store failures only.
    async fn update(&self, collection: &str, id: &str, fields: JsonMap)
        -> Result<(), ClientError>;
}

/// Object-store-like sink serving the published artifact.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Store `bytes` under `name`, fully replacing any prior version.
    ///
    /// Readers must never observe a half-written artifact: the call either
    /// leaves the previous version visible or makes the new one visible.
    /// `content_disposition` is a download hint for browsers and may be
    /// ignored by sinks that have no use for it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the artifact could not be stored; on error
    /// the previously published version must remain intact.
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        content_disposition: Option<&str>,
    ) -> Result<(), ClientError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal in-crate fakes for unit tests.
    //!
    //! The full-featured fakes with mutation counters live in
    //! snapcache-store; these exist so core unit tests stay dependency-free.

    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fixed-content record store backed by nested BTreeMaps.
    #[derive(Default)]
    pub struct TableStore {
        pub tables: BTreeMap<String, BTreeMap<String, JsonMap>>,
        pub fail_list: Option<String>,
        pub deletes: AtomicUsize,
        pub updates: AtomicUsize,
    }

    impl TableStore {
        pub fn insert(&mut self, collection: &str, id: &str, payload: JsonMap) {
            self.tables
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), payload);
        }

        pub fn mutation_count(&self) -> usize {
            self.deletes.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordStore for TableStore {
        async fn list(&self, collection: &str) -> Result<Vec<(String, JsonMap)>, ClientError> {
            if self.fail_list.as_deref() == Some(collection) {
                return Err(ClientError::new("list", "simulated listing failure"));
            }
            Ok(self
                .tables
                .get(collection)
                .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default())
        }

        async fn delete(&self, _collection: &str, _id: &str) -> Result<(), ClientError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn update(
            &self,
            _collection: &str,
            _id: &str,
            _fields: JsonMap,
        ) -> Result<(), ClientError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Sink that records every put, optionally failing all of them.
    #[derive(Default)]
    pub struct CapturingSink {
        pub objects: Mutex<BTreeMap<String, Vec<u8>>>,
        pub fail: bool,
    }

    impl CapturingSink {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn object(&self, name: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(name).cloned()
        }
    }

    #[async_trait]
    impl SnapshotSink for CapturingSink {
        async fn put(
            &self,
            name: &str,
            bytes: &[u8],
            _content_disposition: Option<&str>,
        ) -> Result<(), ClientError> {
            if self.fail {
                return Err(ClientError::new("put", "simulated sink failure"));
            }
            self.objects
                .lock()
                .unwrap()
                .insert(name.to_string(), bytes.to_vec());
            Ok(())
        }
    }
}
