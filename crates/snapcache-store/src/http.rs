//! HTTP client implementations
//!
//! `HttpRecordStore` speaks a plain REST convention against the document
//! store: `GET {base}/{collection}` returns a JSON object of id to payload,
//! `DELETE` and `PATCH` address single records. `HttpSink` uploads the
//! artifact with a single `PUT`, relying on the object store's overwrite
//! semantics for atomic replacement.

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use snapcache_core::{ClientError, JsonMap, RecordStore, SnapshotSink};

fn trim_base(base: impl Into<String>) -> String {
    base.into().trim_end_matches('/').to_string()
}

/// Record store client over a REST document-store API
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    base: String,
    bearer: Option<String>,
}

impl HttpRecordStore {
    pub fn new(base: impl Into<String>, bearer: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base: trim_base(base),
            bearer,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base, collection, id)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list(&self, collection: &str) -> Result<Vec<(String, JsonMap)>, ClientError> {
        let url = format!("{}/{}", self.base, collection);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ClientError::new("list", e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::new(
                "list",
                format!("{} returned {}", url, response.status()),
            ));
        }

        let body: JsonMap = response
            .json()
            .await
            .map_err(|e| ClientError::new("list", e.to_string()))?;

        let mut records = Vec::with_capacity(body.len());
        for (id, value) in body {
            match value {
                Value::Object(payload) => records.push((id, payload)),
                _ => {
                    return Err(ClientError::new(
                        "list",
                        format!("record '{}' in '{}' is not a JSON object", id, collection),
                    ))
                }
            }
        }
        debug!(collection = %collection, records = records.len(), "listed collection");
        Ok(records)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError> {
        let url = self.record_url(collection, id);
        let response = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| ClientError::new("delete", e.to_string()))?;

        // Already-gone records keep deletes idempotent across retried runs.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(ClientError::new(
            "delete",
            format!("{} returned {}", url, response.status()),
        ))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: JsonMap,
    ) -> Result<(), ClientError> {
        let url = self.record_url(collection, id);
        let response = self
            .authorized(self.client.patch(&url))
            .json(&fields)
            .send()
            .await
            .map_err(|e| ClientError::new("update", e.to_string()))?;

        // Records removed since the read phase are treated the same as
        // already-gone deletes.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(ClientError::new(
            "update",
            format!("{} returned {}", url, response.status()),
        ))
    }
}

/// Snapshot sink uploading to an object store bucket over HTTP
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    base: String,
    bucket: String,
    bearer: Option<String>,
}

impl HttpSink {
    pub fn new(base: impl Into<String>, bucket: impl Into<String>, bearer: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base: trim_base(base),
            bucket: bucket.into(),
            bearer,
        }
    }

    /// Bucket this sink uploads into
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl SnapshotSink for HttpSink {
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        content_disposition: Option<&str>,
    ) -> Result<(), ClientError> {
        let url = format!("{}/{}/{}", self.base, self.bucket, name);
        let mut builder = self.client.put(&url).body(bytes.to_vec());
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(disposition) = content_disposition {
            builder = builder.header(CONTENT_DISPOSITION, disposition);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::new("put", e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::new(
                "put",
                format!("{} returned {}", url, response.status()),
            ));
        }
        debug!(object = %name, bucket = %self.bucket, "uploaded artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = HttpRecordStore::new("https://example.test/api/", None);
        assert_eq!(
            store.record_url("Types", "t1"),
            "https://example.test/api/Types/t1"
        );
    }

    #[test]
    fn test_sink_keeps_bucket_name() {
        let sink = HttpSink::new("https://storage.test", "snapshot-artifacts", None);
        assert_eq!(sink.bucket(), "snapshot-artifacts");
    }
}
