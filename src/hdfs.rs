//! HDFS storage implementation using OpenDAL's WebHDFS support.
//!
//! Talks to the cluster through the WebHDFS REST gateway, so no
//! native libhdfs toolchain is needed.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::layers::LoggingLayer;
use opendal::services::Webhdfs;
use opendal::{EntryMode, ErrorKind, Operator};

use crate::error::{StorageError, StorageResult};
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::{StoreKind, StoreParams};

/// Store backed by an HDFS cluster.
///
/// The operator is rooted at the configured cluster path, which is
/// also the scope wiped by `delete_all`. Creates close their writer
/// before returning, so the written blob is flushed and visible to
/// other clients by the time the call completes. Ranged reads past
/// the end of a blob are clamped and return the available prefix.
#[derive(Debug)]
pub struct HdfsStore {
    root: String,
    op: Operator,
}

impl HdfsStore {
    /// Build a store from HDFS parameters.
    pub fn new(params: &StoreParams) -> StorageResult<Self> {
        let StoreParams::Hdfs {
            endpoint,
            root,
            delegation,
        } = params
        else {
            return Err(StorageError::invalid_config("invalid store params for HDFS"));
        };

        let mut builder = Webhdfs::default().endpoint(endpoint).root(root);
        if let Some(token) = delegation {
            builder = builder.delegation(token);
        }

        let op = Operator::new(builder)
            .map_err(|e| StorageError::invalid_config(format!("hdfs operator: {e}")))?
            .layer(LoggingLayer::default())
            .finish();

        Ok(Self {
            root: root.clone(),
            op,
        })
    }
}

#[async_trait]
impl BlobStore for HdfsStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Hdfs
    }

    async fn exists(&self, id: &dyn StorageId) -> StorageResult<bool> {
        match self.op.stat(&id.storage_path()).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::backend("exists", id, e)),
        }
    }

    async fn size(&self, id: &dyn StorageId) -> StorageResult<u64> {
        match self.op.stat(&id.storage_path()).await {
            Ok(meta) => Ok(meta.content_length()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found("size", id)),
            Err(e) => Err(StorageError::backend("size", id, e)),
        }
    }

    async fn create(&self, id: &dyn StorageId, data: Bytes) -> StorageResult<()> {
        if self.exists(id).await? {
            return Err(StorageError::already_exists("create", id));
        }
        let mut writer = self
            .op
            .writer(&id.storage_path())
            .await
            .map_err(|e| StorageError::backend("create", id, e))?;
        writer
            .write(data)
            .await
            .map_err(|e| StorageError::backend("create", id, e))?;
        writer
            .close()
            .await
            .map_err(|e| StorageError::backend("create", id, e))?;
        Ok(())
    }

    async fn create_stream(
        &self,
        id: &dyn StorageId,
        mut data: ByteStream,
        _len: u64,
    ) -> StorageResult<()> {
        if self.exists(id).await? {
            return Err(StorageError::already_exists("create_stream", id));
        }
        let mut writer = self
            .op
            .writer(&id.storage_path())
            .await
            .map_err(|e| StorageError::backend("create_stream", id, e))?;
        while let Some(chunk) = data.next().await {
            writer
                .write(chunk?)
                .await
                .map_err(|e| StorageError::backend("create_stream", id, e))?;
        }
        writer
            .close()
            .await
            .map_err(|e| StorageError::backend("create_stream", id, e))?;
        Ok(())
    }

    async fn delete(&self, id: &dyn StorageId) -> StorageResult<()> {
        if !self.exists(id).await? {
            return Err(StorageError::not_found("delete", id));
        }
        self.op
            .delete(&id.storage_path())
            .await
            .map_err(|e| StorageError::backend("delete", id, e))
    }

    async fn get_bytes(&self, id: &dyn StorageId) -> StorageResult<Bytes> {
        match self.op.read(&id.storage_path()).await {
            Ok(buf) => Ok(buf.to_bytes()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::not_found("get_bytes", id))
            }
            Err(e) => Err(StorageError::backend("get_bytes", id, e)),
        }
    }

    async fn get_range(&self, id: &dyn StorageId, start: u64, end: u64) -> StorageResult<Bytes> {
        if start > end {
            return Err(StorageError::invalid_range("get_range", id, start, end));
        }
        let path = id.storage_path();
        let size = match self.op.stat(&path).await {
            Ok(meta) => meta.content_length(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::not_found("get_range", id));
            }
            Err(e) => return Err(StorageError::backend("get_range", id, e)),
        };

        // Over-long ranges are trimmed to the blob, not an error.
        let end = end.min(size);
        if start >= end {
            return Ok(Bytes::new());
        }
        match self.op.read_with(&path).range(start..end).await {
            Ok(buf) => Ok(buf.to_bytes()),
            Err(e) => Err(StorageError::backend("get_range", id, e)),
        }
    }

    async fn get_stream(&self, id: &dyn StorageId) -> StorageResult<ByteStream> {
        let reader = match self.op.reader(&id.storage_path()).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::not_found("get_stream", id));
            }
            Err(e) => return Err(StorageError::backend("get_stream", id, e)),
        };

        let id_str = id.to_string();
        let stream = reader
            .into_bytes_stream(0..u64::MAX)
            .await
            .map_err(|e| StorageError::backend("get_stream", &id_str, e))?
            .map(move |chunk| {
                chunk.map_err(|e| StorageError::backend("get_stream", &id_str, e))
            });
        Ok(Box::pin(stream))
    }

    async fn delete_all(&self) -> StorageResult<()> {
        let mut lister = self
            .op
            .lister_with("")
            .recursive(true)
            .await
            .map_err(|e| StorageError::backend("delete_all", &self.root, e))?;

        // Files first, then the sharding directories deepest-first so
        // each delete hits an empty directory.
        let mut dirs: Vec<String> = Vec::new();
        while let Some(entry) = lister.next().await {
            let entry = entry.map_err(|e| StorageError::backend("delete_all", &self.root, e))?;
            let path = entry.path().to_string();
            if path.is_empty() || path == "/" {
                continue;
            }
            match entry.metadata().mode() {
                EntryMode::FILE => {
                    self.op
                        .delete(&path)
                        .await
                        .map_err(|e| StorageError::backend("delete_all", &self.root, e))?;
                }
                _ => dirs.push(path),
            }
        }

        dirs.sort_by_key(|path| std::cmp::Reverse(path.matches('/').count()));
        for dir in dirs {
            self.op
                .delete(&dir)
                .await
                .map_err(|e| StorageError::backend("delete_all", &self.root, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::services::Memory;

    #[test]
    fn new_requires_hdfs_params() {
        let err = HdfsStore::new(&StoreParams::InMemory).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[test]
    fn new_builds_from_params() {
        let params = StoreParams::Hdfs {
            endpoint: "http://namenode:9870".to_string(),
            root: "/data/blobs".to_string(),
            delegation: None,
        };
        let store = HdfsStore::new(&params).unwrap();
        assert_eq!(store.kind(), StoreKind::Hdfs);
        assert_eq!(store.description(), "HDFS storage");
    }

    #[tokio::test]
    async fn delete_all_removes_files_and_their_directories() {
        let op = Operator::new(Memory::default()).unwrap().finish();
        let store = HdfsStore {
            root: "/data/blobs".to_string(),
            op: op.clone(),
        };

        op.create_dir("4/").await.unwrap();
        op.create_dir("4/6/").await.unwrap();
        op.write("4/6/one", Bytes::from_static(b"one")).await.unwrap();
        op.write("4/6/two", Bytes::from_static(b"two")).await.unwrap();

        store.delete_all().await.unwrap();

        for path in ["4/6/one", "4/6/two", "4/6/", "4/"] {
            let err = op.stat(path).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound, "{path} survived the wipe");
        }
    }
}
