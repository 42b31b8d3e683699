//! In-memory fakes
//!
//! Full-featured stand-ins for the two external collaborators, with mutation
//! counters and injectable failures. Used by the integration tests; nothing
//! in the production path depends on them.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use snapcache_core::{ClientError, JsonMap, RecordStore, SnapshotSink};

/// In-memory record store keyed by collection then id
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, JsonMap>>>,
    fail_listings: Mutex<BTreeSet<String>>,
    fail_mutations: Mutex<BTreeSet<String>>,
    deletes: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record
    pub fn insert(&self, collection: &str, id: &str, payload: JsonMap) {
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), payload);
    }

    /// Make every listing of the named collection fail
    pub fn fail_listing(&self, collection: &str) {
        self.fail_listings
            .lock()
            .unwrap()
            .insert(collection.to_string());
    }

    /// Make every delete/update of the given id fail
    pub fn fail_mutation(&self, id: &str) {
        self.fail_mutations.lock().unwrap().insert(id.to_string());
    }

    /// Current payload of a record, if present
    pub fn get(&self, collection: &str, id: &str) -> Option<JsonMap> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned()
    }

    pub fn contains(&self, collection: &str, id: &str) -> bool {
        self.get(collection, id).is_some()
    }

    /// Number of delete operations issued (including no-op deletes)
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Number of update operations issued
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Total write-back operations issued
    pub fn mutation_count(&self) -> usize {
        self.delete_count() + self.update_count()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, collection: &str) -> Result<Vec<(String, JsonMap)>, ClientError> {
        if self.fail_listings.lock().unwrap().contains(collection) {
            return Err(ClientError::new("list", "injected listing failure"));
        }
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, payload)| (id.clone(), payload.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.lock().unwrap().contains(id) {
            return Err(ClientError::new("delete", "injected mutation failure"));
        }
        // Missing ids are fine: deletes are idempotent.
        if let Some(records) = self.collections.lock().unwrap().get_mut(collection) {
            records.remove(id);
        }
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: JsonMap,
    ) -> Result<(), ClientError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_mutations.lock().unwrap().contains(id) {
            return Err(ClientError::new("update", "injected mutation failure"));
        }
        // Missing ids are a no-op success, matching the HTTP client.
        if let Some(record) = self
            .collections
            .lock()
            .unwrap()
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
        {
            for (key, value) in fields {
                record.insert(key, value);
            }
        }
        Ok(())
    }
}

/// In-memory snapshot sink
#[derive(Debug, Default)]
pub struct MemorySink {
    objects: Mutex<BTreeMap<String, (Vec<u8>, Option<String>)>>,
    puts: AtomicUsize,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose puts all fail
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    /// Published bytes for the named object, if any
    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .map(|(bytes, _)| bytes.clone())
    }

    /// Content-disposition recorded with the named object
    pub fn disposition(&self, name: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .and_then(|(_, disposition)| disposition.clone())
    }

    /// Number of put attempts, successful or not
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSink for MemorySink {
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        content_disposition: Option<&str>,
    ) -> Result<(), ClientError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::new("put", "injected sink failure"));
        }
        self.objects.lock().unwrap().insert(
            name.to_string(),
            (bytes.to_vec(), content_disposition.map(str::to_string)),
        );
        Ok(())
    }
}
