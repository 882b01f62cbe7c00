//! Uniform blob storage over heterogeneous backends.
//!
//! This crate provides a single [`BlobStore`] contract for storing and
//! retrieving blobs addressed by identifiers, using Apache OpenDAL for
//! the remote backends.
//!
//! Supported storage backends:
//!
//! - **Local filesystem** for development and single-node deployments
//! - **In-memory** for tests and ephemeral caches
//! - **Amazon S3** and S3-compatible services (MinIO, Cloudflare R2)
//! - **Google Cloud Storage (GCS)** for Google Cloud Platform
//! - **Azure Blob Storage** for Microsoft Azure
//! - **HDFS** via the WebHDFS REST gateway
//! - **SFTP** for plain remote hosts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StoreRegistry                           │
//! │  - Holds every configured store under its name              │
//! │  - Built once at startup from StoreConfig entries           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StoreFactory                            │
//! │  - Creates the store matching each config                   │
//! │  - Wraps it in LoggingStore unless disabled                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//! ┌──────────────────┐ ┌──────────────┐ ┌──────────────────┐
//! │   FsStore        │ │  MemoryStore │ │  S3 / GCS /      │
//! │   (tokio::fs)    │ │  (DashMap)   │ │  Azure / HDFS /  │
//! └──────────────────┘ └──────────────┘ │  SFTP (OpenDAL)  │
//!                                       └──────────────────┘
//! ```
//!
//! Blobs are addressed by anything implementing [`StorageId`]. The
//! provided [`UuidId`] and [`KsuidId`] shard their textual form into a
//! four-level directory tree so no single directory grows unbounded.
//!
//! # Example
//!
//! ```ignore
//! use blobstore::{StoreConfig, StoreParams, StoreRegistry, UuidId};
//!
//! // Build every store from configuration
//! let registry = StoreRegistry::from_json(
//!     r#"[
//!         {"name": "scratch", "params": {"type": "inmemory"}},
//!         {"name": "archive", "params": {"type": "fs", "root": "/var/blobs"}}
//!     ]"#,
//! )
//! .await?;
//!
//! let store = registry.get("archive").unwrap();
//!
//! // Store and fetch a blob
//! let id = UuidId::random();
//! store.create(&id, b"hello".to_vec().into()).await?;
//! let data = store.get_bytes(&id).await?;
//! assert_eq!(&data[..], b"hello");
//!
//! store.delete(&id).await?;
//! ```

mod azure;
mod error;
mod factory;
mod gcs;
mod hdfs;
mod id;
mod local_fs;
mod logging;
mod memory;
mod registry;
mod s3;
mod sftp;
mod traits;
mod types;

// Re-export main types
pub use error::{StorageError, StorageResult};
pub use factory::StoreFactory;
pub use id::{sharded_path, KsuidId, StorageId, UuidId, PATH_SEPARATOR};
pub use logging::LoggingStore;
pub use registry::{StoreInfo, StoreRegistry};
pub use traits::{BlobStore, ByteStream, SharedStore};
pub use types::{StoreConfig, StoreKind, StoreParams};

// Re-export storage implementations
pub use azure::AzureStore;
pub use gcs::GcsStore;
pub use hdfs::HdfsStore;
pub use local_fs::FsStore;
pub use memory::MemoryStore;
pub use s3::S3Store;
pub use sftp::SftpStore;
