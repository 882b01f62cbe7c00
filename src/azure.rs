//! Azure Blob Storage implementation using OpenDAL.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::layers::LoggingLayer;
use opendal::services::Azblob;
use opendal::{EntryMode, ErrorKind, Operator};

use crate::error::{StorageError, StorageResult};
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::{StoreKind, StoreParams};

/// Store backed by an Azure Blob Storage container.
#[derive(Debug)]
pub struct AzureStore {
    container: String,
    op: Operator,
}

impl AzureStore {
    /// Build a store from Azure parameters.
    ///
    /// When no endpoint override is given, the standard
    /// `https://{account}.blob.core.windows.net` endpoint is derived
    /// from the account name.
    pub fn new(params: &StoreParams) -> StorageResult<Self> {
        let StoreParams::Azure {
            account_name,
            container,
            account_key,
            endpoint,
        } = params
        else {
            return Err(StorageError::invalid_config(
                "invalid store params for Azure",
            ));
        };

        let endpoint = match endpoint {
            Some(ep) if !ep.is_empty() => ep.clone(),
            _ => format!("https://{account_name}.blob.core.windows.net"),
        };

        let mut builder = Azblob::default()
            .container(container)
            .account_name(account_name)
            .endpoint(&endpoint);

        if let Some(key) = account_key {
            builder = builder.account_key(key);
        }

        let op = Operator::new(builder)
            .map_err(|e| StorageError::invalid_config(format!("azure operator: {e}")))?
            .layer(LoggingLayer::default())
            .finish();

        Ok(Self {
            container: container.clone(),
            op,
        })
    }
}

#[async_trait]
impl BlobStore for AzureStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Azure
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
            .map_err(|e| StorageError::backend("delete_all", &self.container, e))?;

        while let Some(entry) = lister.next().await {
            let entry =
                entry.map_err(|e| StorageError::backend("delete_all", &self.container, e))?;
            if entry.metadata().mode() == EntryMode::FILE {
                self.op
                    .delete(entry.path())
                    .await
                    .map_err(|e| StorageError::backend("delete_all", &self.container, e))?;
            }
        }
        Ok(())
    }
}
