//! Google Cloud Storage implementation using OpenDAL.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::layers::LoggingLayer;
use opendal::services::Gcs;
use opendal::{EntryMode, ErrorKind, Operator};

use crate::error::{StorageError, StorageResult};
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::{StoreKind, StoreParams};

/// Store backed by a GCS bucket.
///
/// Same create/delete existence checks as the other object stores:
/// GCS writes are upserts natively, so the contract's create-new and
/// delete-must-exist semantics are imposed with a stat first.
#[derive(Debug)]
pub struct GcsStore {
    bucket: String,
    op: Operator,
}

impl GcsStore {
    /// Build a store from GCS parameters.
    pub fn new(params: &StoreParams) -> StorageResult<Self> {
        let StoreParams::Gcs {
            bucket,
            credential_path,
            endpoint,
        } = params
        else {
            return Err(StorageError::invalid_config("invalid store params for GCS"));
        };

        let mut builder = Gcs::default().bucket(bucket);

        if let Some(creds) = credential_path {
            let creds = creds.to_str().ok_or_else(|| {
                StorageError::invalid_config("gcs credential path is not valid UTF-8")
            })?;
            builder = builder.credential_path(creds);
        }
        if let Some(ep) = endpoint {
            if !ep.is_empty() {
                builder = builder.endpoint(ep);
            }
        }

        let op = Operator::new(builder)
            .map_err(|e| StorageError::invalid_config(format!("gcs operator: {e}")))?
            .layer(LoggingLayer::default())
            .finish();

        Ok(Self {
            bucket: bucket.clone(),
            op,
        })
    }
}

#[async_trait]
impl BlobStore for GcsStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Gcs
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
        self.op
            .write(&id.storage_path(), data)
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
        match self.op.read_with(&id.storage_path()).range(start..end).await {
            Ok(buf) => Ok(buf.to_bytes()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::not_found("get_range", id))
            }
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
            .map_err(|e| StorageError::backend("delete_all", &self.bucket, e))?;

        while let Some(entry) = lister.next().await {
            let entry = entry.map_err(|e| StorageError::backend("delete_all", &self.bucket, e))?;
            if entry.metadata().mode() == EntryMode::FILE {
                self.op
                    .delete(entry.path())
                    .await
                    .map_err(|e| StorageError::backend("delete_all", &self.bucket, e))?;
            }
        }
        Ok(())
    }
}
