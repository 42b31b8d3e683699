//! Snapcache Store - Client implementations
//!
//! Provides:
//! - HTTP record store and HTTP sink (reqwest) for real deployments
//! - Filesystem sink with atomic temp-file + rename publish
//! - In-memory fakes with mutation counters for tests

pub mod fs;
pub mod http;
pub mod memory;

// Re-export key types
pub use fs::FsSink;
pub use http::{HttpRecordStore, HttpSink};
pub use memory::{MemoryRecordStore, MemorySink};
