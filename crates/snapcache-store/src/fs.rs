//! Filesystem sink
//!
//! Uses the temp→rename pattern so readers of the published file never see
//! a partial write, mirroring the overwrite contract of the HTTP sink.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use snapcache_core::{ClientError, SnapshotSink};

/// Snapshot sink writing artifacts under a root directory
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path the named artifact is published at
    pub fn target_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Atomically write bytes to a file via temp file + rename
fn atomic_write(target_path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = target_path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, target_path)?;
    Ok(())
}

#[async_trait]
impl SnapshotSink for FsSink {
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        _content_disposition: Option<&str>,
    ) -> Result<(), ClientError> {
        // content-disposition is a download hint; a filesystem has no use
        // for it.
        let target = self.target_path(name);
        atomic_write(&target, bytes).map_err(|e| ClientError::new("put", e.to_string()))?;
        debug!(path = %target.display(), size_bytes = bytes.len(), "wrote artifact");
        Ok(())
    }
}
