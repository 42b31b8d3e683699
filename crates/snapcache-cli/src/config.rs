//! Run configuration
//!
//! Loaded from a TOML file. The bucket can additionally be overridden by the
//! `SNAPCACHE_BUCKET` environment variable, which deployments use to point
//! the same config at different environments.

use serde::Deserialize;
use snapcache_core::publish::DEFAULT_OBJECT_NAME;
use snapcache_core::reader::{DEFAULT_RETIRED_FIELD, DEFAULT_TIMESTAMP_FIELD};
use snapcache_core::run::DEFAULT_CONCURRENCY;
use snapcache_core::{ReadOptions, ReconcilePolicy};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the configured bucket
pub const BUCKET_ENV: &str = "SNAPCACHE_BUCKET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

/// Top-level run configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Ordered collection names to capture
    pub collections: Vec<String>,
    /// Write-back policy (defaults to delete-retired)
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Bound on in-flight reconciliation mutations
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Artifact name at the sink
    #[serde(default = "default_object_name")]
    pub object_name: String,
    /// Attach a content-disposition download hint
    #[serde(default = "default_true")]
    pub as_attachment: bool,
    /// Name of the boolean retirement marker field
    #[serde(default = "default_retired_field")]
    pub retired_field: String,
    /// Name of the stripped mutation timestamp field
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    pub record_store: RecordStoreConfig,
    pub sink: SinkConfig,
}

/// Reconciliation policy selection
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", rename_all_fields = "kebab-case", tag = "kind")]
pub enum PolicyConfig {
    /// Physically remove retired records after publish
    #[default]
    DeleteRetired,
    /// Stamp every kept record with the capture timestamp
    StampKept {
        #[serde(default = "default_stamp_field")]
        field: String,
    },
}

/// Record store endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RecordStoreConfig {
    /// Base URL of the document-store REST API
    pub base_url: String,
    /// Environment variable holding the bearer token, if auth is required
    #[serde(default)]
    pub token_env: Option<String>,
}

/// Where the artifact gets published
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", rename_all_fields = "kebab-case", tag = "kind")]
pub enum SinkConfig {
    /// Object store bucket over HTTP
    Http {
        base_url: String,
        bucket: String,
        #[serde(default)]
        token_env: Option<String>,
    },
    /// Local directory (mostly for staging and smoke tests)
    Fs { root: PathBuf },
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_object_name() -> String {
    DEFAULT_OBJECT_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_retired_field() -> String {
    DEFAULT_RETIRED_FIELD.to_string()
}

fn default_timestamp_field() -> String {
    DEFAULT_TIMESTAMP_FIELD.to_string()
}

fn default_stamp_field() -> String {
    "lastCachedAt".to_string()
}

impl Config {
    /// Load and validate a config file, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if the
    /// collection list is empty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        if config.collections.is_empty() {
            return Err(ConfigError::Invalid {
                message: "at least one collection must be configured".to_string(),
            });
        }

        if let Ok(bucket) = std::env::var(BUCKET_ENV) {
            if let SinkConfig::Http {
                bucket: configured, ..
            } = &mut config.sink
            {
                *configured = bucket;
            }
        }

        Ok(config)
    }

    /// Reserved control field names for the read phase
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            retired_field: self.retired_field.clone(),
            timestamp_field: self.timestamp_field.clone(),
        }
    }

    /// Core reconciliation policy from the config selection
    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        match &self.policy {
            PolicyConfig::DeleteRetired => ReconcilePolicy::DeleteRetired,
            PolicyConfig::StampKept { field } => ReconcilePolicy::StampKept {
                field: field.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP_LEVEL: &str = "collections = [\"Categories\", \"Types\", \"Incidents\"]\n";

    const TABLES: &str = r#"
        [record-store]
        base-url = "https://records.example.test/api"

        [sink]
        kind = "http"
        base-url = "https://storage.example.test"
        bucket = "snapshots"
    "#;

    fn minimal() -> String {
        format!("{}{}", TOP_LEVEL, TABLES)
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = toml::from_str(&minimal()).unwrap();

        assert_eq!(config.collections.len(), 3);
        assert_eq!(config.policy, PolicyConfig::DeleteRetired);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.object_name, "state.json");
        assert!(config.as_attachment);
        assert_eq!(config.retired_field, "deleted");
        assert_eq!(config.timestamp_field, "updatedAt");
    }

    #[test]
    fn test_stamp_kept_policy_parses() {
        let text = format!(
            "{}\n[policy]\nkind = \"stamp-kept\"\nfield = \"cachedAt\"\n",
            minimal()
        );
        let config: Config = toml::from_str(&text).unwrap();

        assert_eq!(
            config.reconcile_policy(),
            ReconcilePolicy::StampKept {
                field: "cachedAt".to_string()
            }
        );
    }

    #[test]
    fn test_stamp_kept_default_field() {
        let text = format!("{}\n[policy]\nkind = \"stamp-kept\"\n", minimal());
        let config: Config = toml::from_str(&text).unwrap();

        assert_eq!(
            config.reconcile_policy(),
            ReconcilePolicy::StampKept {
                field: "lastCachedAt".to_string()
            }
        );
    }

    #[test]
    fn test_http_sink_parses_kebab_case_fields() {
        let text = format!(
            "{}\n[record-store]\nbase-url = \"https://records.example.test/api\"\n\
             [sink]\nkind = \"http\"\nbase-url = \"https://storage.example.test\"\n\
             bucket = \"snapshots\"\ntoken-env = \"SNAPCACHE_TOKEN\"\n",
            TOP_LEVEL
        );
        let config: Config = toml::from_str(&text).unwrap();

        assert_eq!(
            config.sink,
            SinkConfig::Http {
                base_url: "https://storage.example.test".to_string(),
                bucket: "snapshots".to_string(),
                token_env: Some("SNAPCACHE_TOKEN".to_string()),
            }
        );
    }

    #[test]
    fn test_fs_sink_parses() {
        let text = r#"
            collections = ["Types"]

            [record-store]
            base-url = "https://records.example.test/api"

            [sink]
            kind = "fs"
            root = "/var/lib/snapcache"
        "#;
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(
            config.sink,
            SinkConfig::Fs {
                root: PathBuf::from("/var/lib/snapcache")
            }
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let text = format!("{}surprise = true\n{}", TOP_LEVEL, TABLES);
        assert!(toml::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn test_unknown_policy_kind_rejected() {
        let text = format!("{}\n[policy]\nkind = \"merge-somehow\"\n", minimal());
        assert!(toml::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn test_load_rejects_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapcache.toml");
        std::fs::write(
            &path,
            r#"
            collections = []

            [record-store]
            base-url = "https://records.example.test/api"

            [sink]
            kind = "fs"
            root = "/tmp/out"
            "#,
        )
        .unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_read_options_from_custom_fields() {
        let text = format!(
            "{}retired-field = \"archived\"\ntimestamp-field = \"touchedAt\"\n{}",
            TOP_LEVEL, TABLES
        );
        let config: Config = toml::from_str(&text).unwrap();
        let options = config.read_options();

        assert_eq!(options.retired_field, "archived");
        assert_eq!(options.timestamp_field, "touchedAt");
    }
}
