//! S3 storage implementation using OpenDAL.
//!
//! Covers Amazon S3 and S3-compatible services such as MinIO,
//! Cloudflare R2 and DigitalOcean Spaces.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::layers::LoggingLayer;
use opendal::services::S3;
use opendal::{EntryMode, ErrorKind, Operator};

use crate::error::{StorageError, StorageResult};
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::{StoreKind, StoreParams};

/// Store backed by an S3 bucket.
///
/// Object stores upsert natively and delete without complaint, so
/// `create` and `delete` do an existence check first to impose the
/// contract's create-new and delete-must-exist semantics. Those
/// checks can race with concurrent writers.
#[derive(Debug)]
pub struct S3Store {
    bucket: String,
    op: Operator,
}

impl S3Store {
    /// Build a store from S3 parameters.
    pub fn new(params: &StoreParams) -> StorageResult<Self> {
        let StoreParams::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            allow_anonymous,
        } = params
        else {
            return Err(StorageError::invalid_config("invalid store params for S3"));
        };

        let mut builder = S3::default().bucket(bucket).region(region);

        if let Some(ep) = endpoint {
            if !ep.is_empty() {
                builder = builder.endpoint(ep);
            }
        }
        if let Some(key_id) = access_key_id {
            builder = builder.access_key_id(key_id);
        }
        if let Some(secret) = secret_access_key {
            builder = builder.secret_access_key(secret);
        }
        if *allow_anonymous {
            builder = builder.allow_anonymous();
        }

        let op = Operator::new(builder)
            .map_err(|e| StorageError::invalid_config(format!("s3 operator: {e}")))?
            .layer(LoggingLayer::default())
            .finish();

        Ok(Self {
            bucket: bucket.clone(),
            op,
        })
    }
}

#[async_trait]
impl BlobStore for S3Store {
    fn kind(&self) -> StoreKind {
        StoreKind::S3
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
