//! Publish step
//!
//! Makes the encoded snapshot the current published artifact under a fixed,
//! well-known name. Atomicity is the sink's contract: either the previous
//! version stays visible or the new one becomes visible, never a half-write.

use tracing::info;

use crate::client::SnapshotSink;
use crate::errors::{Result, RunError};

/// Well-known artifact name readers fetch
pub const DEFAULT_OBJECT_NAME: &str = "state.json";

/// Content-disposition hint telling downloading clients to save the artifact
/// as a named attachment file. Presentation convenience only.
pub fn attachment_disposition(object: &str) -> String {
    format!("attachment; filename=\"{}\"", object)
}

/// Publish the encoded snapshot, fully replacing the prior version.
///
/// # Errors
///
/// Returns `RunError::Publish` if the sink rejects the write. On failure the
/// caller must not reconcile: the source records would be mutated for a
/// snapshot that was never made visible.
pub async fn publish(
    sink: &dyn SnapshotSink,
    object: &str,
    bytes: &[u8],
    content_disposition: Option<&str>,
) -> Result<()> {
    sink.put(object, bytes, content_disposition)
        .await
        .map_err(|e| RunError::Publish {
            object: object.to_string(),
            message: e.to_string(),
        })?;

    info!(
        object = %object,
        size_bytes = bytes.len(),
        "published snapshot"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::CapturingSink;

    #[test]
    fn test_attachment_disposition_format() {
        assert_eq!(
            attachment_disposition("state.json"),
            "attachment; filename=\"state.json\""
        );
    }

    #[tokio::test]
    async fn test_publish_stores_bytes_under_name() {
        let sink = CapturingSink::default();
        publish(&sink, DEFAULT_OBJECT_NAME, b"{}", None)
            .await
            .unwrap();
        assert_eq!(sink.object(DEFAULT_OBJECT_NAME).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_publish_failure_maps_to_taxonomy() {
        let sink = CapturingSink::failing();
        let result = publish(&sink, "state.json", b"{}", None).await;
        assert!(matches!(
            result,
            Err(RunError::Publish { object, .. }) if object == "state.json"
        ));
    }
}
