//! SFTP storage implementation using OpenDAL.
//!
//! Unlike the long-lived object store adapters, every operation opens
//! a fresh authenticated session and drops it when the operation
//! finishes, success or error. Authentication is key-based (explicit
//! private key or the ssh agent).

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::layers::LoggingLayer;
use opendal::services::Sftp;
use opendal::{EntryMode, ErrorKind, Operator};
use std::path::PathBuf;

use crate::error::{StorageError, StorageResult};
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::{StoreKind, StoreParams};

/// Store backed by a directory on an SFTP host.
///
/// Ranged reads are not provided over SFTP and fail with
/// [`StorageError::Unsupported`] without touching the host.
#[derive(Debug)]
pub struct SftpStore {
    endpoint: String,
    user: String,
    key: Option<PathBuf>,
    known_hosts_strategy: Option<String>,
    root: String,
}

impl SftpStore {
    /// Build a store from SFTP parameters.
    pub fn new(params: &StoreParams) -> StorageResult<Self> {
        let StoreParams::Sftp {
            endpoint,
            user,
            key,
            known_hosts_strategy,
            root,
        } = params
        else {
            return Err(StorageError::invalid_config("invalid store params for SFTP"));
        };

        Ok(Self {
            endpoint: endpoint.clone(),
            user: user.clone(),
            key: key.clone(),
            known_hosts_strategy: known_hosts_strategy.clone(),
            root: root.clone(),
        })
    }

    /// Open a fresh session for one operation.
    ///
    /// The returned operator is dropped by the caller at the end of
    /// the operation, which closes the session. For streamed reads
    /// the session lives as long as the returned stream.
    fn session(&self) -> StorageResult<Operator> {
        let mut builder = Sftp::default()
            .endpoint(&self.endpoint)
            .user(&self.user)
            .root(&self.root);

        if let Some(key) = &self.key {
            let key = key.to_str().ok_or_else(|| {
                StorageError::invalid_config("sftp key path is not valid UTF-8")
            })?;
            builder = builder.key(key);
        }
        if let Some(strategy) = &self.known_hosts_strategy {
            builder = builder.known_hosts_strategy(strategy);
        }

        Ok(Operator::new(builder)
            .map_err(|e| StorageError::invalid_config(format!("sftp session: {e}")))?
            .layer(LoggingLayer::default())
            .finish())
    }

    /// Existence check through a session the caller already opened.
    async fn exists_in(&self, op: &Operator, id: &dyn StorageId) -> StorageResult<bool> {
        match op.stat(&id.storage_path()).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::backend("exists", id, e)),
        }
    }

    /// Create each missing ancestor directory of `path`, one segment
    /// at a time.
    async fn ensure_parent_dirs(
        &self,
        op: &Operator,
        path: &str,
        id: &dyn StorageId,
        op_name: &'static str,
    ) -> StorageResult<()> {
        let Some((dirs, _file)) = path.rsplit_once('/') else {
            return Ok(());
        };
        let mut prefix = String::with_capacity(dirs.len() + 1);
        for segment in dirs.split('/') {
            prefix.push_str(segment);
            prefix.push('/');
            match op.create_dir(&prefix).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(StorageError::backend(op_name, id, e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for SftpStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sftp
    }

    async fn exists(&self, id: &dyn StorageId) -> StorageResult<bool> {
        let op = self.session()?;
        self.exists_in(&op, id).await
    }

    async fn size(&self, id: &dyn StorageId) -> StorageResult<u64> {
        let op = self.session()?;
        match op.stat(&id.storage_path()).await {
            Ok(meta) => Ok(meta.content_length()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found("size", id)),
            Err(e) => Err(StorageError::backend("size", id, e)),
        }
    }

    async fn create(&self, id: &dyn StorageId, data: Bytes) -> StorageResult<()> {
        let op = self.session()?;
        if self.exists_in(&op, id).await? {
            return Err(StorageError::already_exists("create", id));
        }
        let path = id.storage_path();
        self.ensure_parent_dirs(&op, &path, id, "create").await?;
        op.write(&path, data)
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
        let op = self.session()?;
        if self.exists_in(&op, id).await? {
            return Err(StorageError::already_exists("create_stream", id));
        }
        let path = id.storage_path();
        self.ensure_parent_dirs(&op, &path, id, "create_stream").await?;
        let mut writer = op
            .writer(&path)
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
        let op = self.session()?;
        if !self.exists_in(&op, id).await? {
            return Err(StorageError::not_found("delete", id));
        }
        op.delete(&id.storage_path())
            .await
            .map_err(|e| StorageError::backend("delete", id, e))
    }

    async fn get_bytes(&self, id: &dyn StorageId) -> StorageResult<Bytes> {
        let op = self.session()?;
        match op.read(&id.storage_path()).await {
            Ok(buf) => Ok(buf.to_bytes()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::not_found("get_bytes", id))
            }
            Err(e) => Err(StorageError::backend("get_bytes", id, e)),
        }
    }

    async fn get_range(&self, _id: &dyn StorageId, _start: u64, _end: u64) -> StorageResult<Bytes> {
        Err(StorageError::unsupported(self.description(), "get_range"))
    }

    async fn get_stream(&self, id: &dyn StorageId) -> StorageResult<ByteStream> {
        let op = self.session()?;
        let reader = match op.reader(&id.storage_path()).await {
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
        let op = self.session()?;
        let mut lister = op
            .lister_with("")
            .recursive(true)
            .await
            .map_err(|e| StorageError::backend("delete_all", &self.root, e))?;

        // Files first, then directories deepest-first so each rmdir
        // sees an empty directory.
        let mut dirs: Vec<String> = Vec::new();
        while let Some(entry) = lister.next().await {
            let entry = entry.map_err(|e| StorageError::backend("delete_all", &self.root, e))?;
            let path = entry.path().to_string();
            if path.is_empty() || path == "/" {
                continue;
            }
            match entry.metadata().mode() {
                EntryMode::FILE => {
                    op.delete(&path)
                        .await
                        .map_err(|e| StorageError::backend("delete_all", &self.root, e))?;
                }
                _ => dirs.push(path),
            }
        }

        dirs.sort_by_key(|path| std::cmp::Reverse(path.matches('/').count()));
        for dir in dirs {
            op.delete(&dir)
                .await
                .map_err(|e| StorageError::backend("delete_all", &self.root, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::UuidId;
    use opendal::services::Memory;

    fn test_params() -> StoreParams {
        StoreParams::Sftp {
            endpoint: "ssh://127.0.0.1:22".to_string(),
            user: "blob".to_string(),
            key: None,
            known_hosts_strategy: None,
            root: "/srv/blobs".to_string(),
        }
    }

    #[test]
    fn new_requires_sftp_params() {
        let err = SftpStore::new(&StoreParams::InMemory).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn range_reads_are_refused_without_a_session() {
        let store = SftpStore::new(&test_params()).unwrap();
        let id = UuidId::random();

        let err = store.get_range(&id, 0, 16).await.unwrap_err();
        assert!(matches!(err, StorageError::Unsupported { .. }));
        assert_eq!(err.to_string(), "SFTP storage does not support get_range");
    }

    // The pre-check inside create/create_stream/delete goes through the
    // session those operations already opened, never a second one.
    #[tokio::test]
    async fn exists_in_answers_through_the_session_it_is_given() {
        let store = SftpStore::new(&test_params()).unwrap();
        let id = UuidId::random();
        let op = Operator::new(Memory::default()).unwrap().finish();

        assert!(!store.exists_in(&op, &id).await.unwrap());
        op.write(&id.storage_path(), Bytes::from_static(b"blob"))
            .await
            .unwrap();
        assert!(store.exists_in(&op, &id).await.unwrap());
    }
}
