//! Store configuration types.
//!
//! A [`StoreConfig`] names one store and carries the backend-specific
//! parameters that select and drive its implementation. Configurations
//! deserialize from JSON documents supplied by the embedding
//! application and are validated before any backend is touched.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{StorageError, StorageResult};

/// Supported storage backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Local filesystem
    Fs,
    /// Process-local in-memory map
    InMemory,
    /// Amazon S3 and S3-compatible services (MinIO, R2)
    S3,
    /// Google Cloud Storage
    Gcs,
    /// Azure Blob Storage
    Azure,
    /// HDFS through a WebHDFS gateway
    Hdfs,
    /// SFTP host
    Sftp,
}

impl StoreKind {
    /// Get the display name for this backend kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            StoreKind::Fs => "File system storage",
            StoreKind::InMemory => "In-memory storage",
            StoreKind::S3 => "S3 object storage",
            StoreKind::Gcs => "Google Cloud Storage",
            StoreKind::Azure => "Azure Blob storage",
            StoreKind::Hdfs => "HDFS storage",
            StoreKind::Sftp => "SFTP storage",
        }
    }

    /// Get all available backend kinds.
    pub fn all() -> Vec<StoreKind> {
        vec![
            StoreKind::Fs,
            StoreKind::InMemory,
            StoreKind::S3,
            StoreKind::Gcs,
            StoreKind::Azure,
            StoreKind::Hdfs,
            StoreKind::Sftp,
        ]
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Backend-specific parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreParams {
    /// Local filesystem parameters.
    Fs {
        /// Directory all blobs live under.
        root: PathBuf,
    },
    /// In-memory store; holds no parameters.
    InMemory,
    /// S3 and S3-compatible parameters.
    S3 {
        /// Bucket name
        bucket: String,
        /// Region (e.g. "us-east-1")
        region: String,
        /// Endpoint override for S3-compatible services (MinIO, R2)
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key id
        #[serde(default)]
        access_key_id: Option<String>,
        /// Secret access key
        #[serde(default)]
        secret_access_key: Option<String>,
        /// Send unsigned requests, for public buckets
        #[serde(default)]
        allow_anonymous: bool,
    },
    /// Google Cloud Storage parameters.
    Gcs {
        /// Bucket name
        bucket: String,
        /// Service account credentials JSON path
        #[serde(default)]
        credential_path: Option<PathBuf>,
        /// Endpoint override for GCS-compatible test servers
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// Azure Blob Storage parameters.
    Azure {
        /// Storage account name
        account_name: String,
        /// Container name
        container: String,
        /// Account key
        #[serde(default)]
        account_key: Option<String>,
        /// Endpoint override (e.g. Azurite); derived from the account
        /// name when unset
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// HDFS parameters, addressed through a WebHDFS gateway.
    Hdfs {
        /// Gateway endpoint, e.g. "http://namenode:9870"
        endpoint: String,
        /// Cluster path all blobs live under; also the scope of
        /// delete_all
        root: String,
        /// Delegation token
        #[serde(default)]
        delegation: Option<String>,
    },
    /// SFTP parameters.
    Sftp {
        /// Host endpoint, e.g. "ssh://host:22"
        endpoint: String,
        /// Login user
        user: String,
        /// Private key path; falls back to the ssh agent when unset
        #[serde(default)]
        key: Option<PathBuf>,
        /// known_hosts checking strategy ("strict", "accept-new" or
        /// "off")
        #[serde(default)]
        known_hosts_strategy: Option<String>,
        /// Remote directory all blobs live under
        root: String,
    },
}

impl StoreParams {
    /// Create local filesystem parameters.
    pub fn fs(root: impl Into<PathBuf>) -> Self {
        StoreParams::Fs { root: root.into() }
    }

    /// Create S3 parameters with the default endpoint and no
    /// credentials.
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        StoreParams::S3 {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_anonymous: false,
        }
    }

    /// Backend kind these parameters select.
    pub fn kind(&self) -> StoreKind {
        match self {
            StoreParams::Fs { .. } => StoreKind::Fs,
            StoreParams::InMemory => StoreKind::InMemory,
            StoreParams::S3 { .. } => StoreKind::S3,
            StoreParams::Gcs { .. } => StoreKind::Gcs,
            StoreParams::Azure { .. } => StoreKind::Azure,
            StoreParams::Hdfs { .. } => StoreKind::Hdfs,
            StoreParams::Sftp { .. } => StoreKind::Sftp,
        }
    }
}

/// Configuration for one named store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Name the store is registered under.
    pub name: String,
    /// Wrap the store in the logging decorator.
    #[serde(default)]
    pub logging: bool,
    /// Backend-specific parameters.
    pub params: StoreParams,
}

impl StoreConfig {
    /// Create a new store configuration.
    pub fn new(name: impl Into<String>, params: StoreParams) -> Self {
        Self {
            name: name.into(),
            logging: false,
            params,
        }
    }

    /// Enable the logging decorator for this store.
    pub fn with_logging(mut self) -> Self {
        self.logging = true;
        self
    }

    /// Backend kind selected by the parameters.
    pub fn kind(&self) -> StoreKind {
        self.params.kind()
    }

    /// Parse a JSON list of store configurations, e.g. the contents
    /// of a deployment's `stores.json`.
    pub fn parse_json(json: &str) -> StorageResult<Vec<StoreConfig>> {
        serde_json::from_str(json)
            .map_err(|e| StorageError::invalid_config(format!("config parse: {e}")))
    }

    /// Reject configurations with missing required fields.
    pub fn validate(&self) -> StorageResult<()> {
        if self.name.trim().is_empty() {
            return Err(StorageError::invalid_config("store name is required"));
        }
        match &self.params {
            StoreParams::Fs { root } => {
                if root.as_os_str().is_empty() {
                    return Err(StorageError::invalid_config("fs root path is required"));
                }
            }
            StoreParams::InMemory => {}
            StoreParams::S3 { bucket, region, .. } => {
                if bucket.is_empty() {
                    return Err(StorageError::invalid_config("s3 bucket is required"));
                }
                if region.is_empty() {
                    return Err(StorageError::invalid_config("s3 region is required"));
                }
            }
            StoreParams::Gcs { bucket, .. } => {
                if bucket.is_empty() {
                    return Err(StorageError::invalid_config("gcs bucket is required"));
                }
            }
            StoreParams::Azure {
                account_name,
                container,
                ..
            } => {
                if account_name.is_empty() {
                    return Err(StorageError::invalid_config("azure account name is required"));
                }
                if container.is_empty() {
                    return Err(StorageError::invalid_config("azure container is required"));
                }
            }
            StoreParams::Hdfs { endpoint, root, .. } => {
                if endpoint.is_empty() {
                    return Err(StorageError::invalid_config("hdfs endpoint is required"));
                }
                if root.is_empty() {
                    return Err(StorageError::invalid_config("hdfs root is required"));
                }
            }
            StoreParams::Sftp {
                endpoint,
                user,
                root,
                ..
            } => {
                if endpoint.is_empty() {
                    return Err(StorageError::invalid_config("sftp endpoint is required"));
                }
                if user.is_empty() {
                    return Err(StorageError::invalid_config("sftp user is required"));
                }
                if root.is_empty() {
                    return Err(StorageError::invalid_config("sftp root is required"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_names() {
        assert_eq!(StoreKind::Fs.display_name(), "File system storage");
        assert_eq!(StoreKind::Sftp.display_name(), "SFTP storage");
        assert_eq!(StoreKind::all().len(), 7);
    }

    #[test]
    fn params_select_their_kind() {
        assert_eq!(StoreParams::fs("/tmp/blobs").kind(), StoreKind::Fs);
        assert_eq!(StoreParams::InMemory.kind(), StoreKind::InMemory);
        assert_eq!(StoreParams::s3("b", "us-east-1").kind(), StoreKind::S3);
    }

    #[test]
    fn validation_accepts_complete_configs() {
        let config = StoreConfig::new("docs", StoreParams::s3("my-bucket", "us-east-1"));
        assert!(config.validate().is_ok());

        let config = StoreConfig::new("scratch", StoreParams::InMemory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_missing_fields() {
        let config = StoreConfig::new("docs", StoreParams::s3("", "us-east-1"));
        assert!(config.validate().is_err());

        let config = StoreConfig::new("  ", StoreParams::InMemory);
        assert!(config.validate().is_err());

        let config = StoreConfig::new(
            "cluster",
            StoreParams::Hdfs {
                endpoint: "http://namenode:9870".to_string(),
                root: String::new(),
                delegation: None,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_json_round_trip() {
        let config = StoreConfig::new("docs", StoreParams::s3("my-bucket", "us-east-1"));
        let json = serde_json::to_string(&config).unwrap();
        let back: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "docs");
        assert_eq!(back.kind(), StoreKind::S3);
        assert!(!back.logging);
    }

    #[test]
    fn parse_json_reads_a_config_list() {
        let json = r#"[
            {"name": "scratch", "params": {"type": "inmemory"}},
            {"name": "docs", "logging": true,
             "params": {"type": "s3", "bucket": "b", "region": "us-east-1"}}
        ]"#;
        let configs = StoreConfig::parse_json(json).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].kind(), StoreKind::InMemory);
        assert!(configs[1].logging);
    }

    #[test]
    fn parse_json_rejects_malformed_input() {
        let err = StoreConfig::parse_json("{ not json").unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }
}
