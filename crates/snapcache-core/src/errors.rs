//! Error taxonomy for snapshot runs
//!
//! The three fatal stages (reading, encoding, publishing) map to `RunError`
//! variants and abort the run before anything downstream happens. Per-record
//! reconciliation failures are deliberately not part of this taxonomy: they
//! are aggregated into a [`crate::reconcile::ReconcileReport`] and never
//! invalidate an already-published snapshot.

use thiserror::Error;

/// Result type alias using RunError
pub type Result<T> = std::result::Result<T, RunError>;

/// Fatal errors that terminate a snapshot run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    /// Listing a collection failed; the run aborts before any write occurs
    #[error("failed to read collection '{collection}': {message}")]
    CollectionRead { collection: String, message: String },

    /// A kept payload could not be serialized; nothing was published
    #[error("failed to encode snapshot: {message}")]
    Encode { message: String },

    /// The sink rejected the artifact; reconciliation never ran
    #[error("failed to publish '{object}': {message}")]
    Publish { object: String, message: String },
}

impl RunError {
    /// Stage label for logs and the process exit report
    pub fn stage(&self) -> &'static str {
        match self {
            RunError::CollectionRead { .. } => "reading",
            RunError::Encode { .. } => "encoding",
            RunError::Publish { .. } => "publishing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        let cases = [
            (
                RunError::CollectionRead {
                    collection: "Types".into(),
                    message: "boom".into(),
                },
                "reading",
            ),
            (
                RunError::Encode {
                    message: "boom".into(),
                },
                "encoding",
            ),
            (
                RunError::Publish {
                    object: "state.json".into(),
                    message: "boom".into(),
                },
                "publishing",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.stage(), expected, "wrong stage for {:?}", err);
        }
    }

    #[test]
    fn test_display_includes_collection() {
        let err = RunError::CollectionRead {
            collection: "Incidents".into(),
            message: "connection reset".into(),
        };
        let text = err.to_string();
        assert!(text.contains("Incidents"));
        assert!(text.contains("connection reset"));
    }
}
