//! Local filesystem storage.

use std::io::SeekFrom;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{StorageError, StorageResult};
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::StoreKind;

/// Chunk size for streamed reads.
const STREAM_CHUNK: usize = 10 * 1024;

/// Store rooted at a local directory.
///
/// Blobs are regular files under the root; the sharded identifier
/// path keeps directory fan-out bounded.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if it is
    /// missing.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::backend("open", root.display(), e))?;
        Ok(Self { root })
    }

    /// Directory all blobs live under.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn blob_path(&self, id: &dyn StorageId) -> PathBuf {
        self.root.join(id.storage_path())
    }

    async fn open_new(&self, id: &dyn StorageId, op: &'static str) -> StorageResult<fs::File> {
        let path = self.blob_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::backend(op, id, e))?;
        }
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StorageError::already_exists(op, id),
                _ => StorageError::backend(op, id, e),
            })
    }
}

#[async_trait]
impl BlobStore for FsStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Fs
    }

    async fn exists(&self, id: &dyn StorageId) -> StorageResult<bool> {
        match fs::metadata(self.blob_path(id)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::backend("exists", id, e)),
        }
    }

    async fn size(&self, id: &dyn StorageId) -> StorageResult<u64> {
        match fs::metadata(self.blob_path(id)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found("size", id))
            }
            Err(e) => Err(StorageError::backend("size", id, e)),
        }
    }

    async fn create(&self, id: &dyn StorageId, data: Bytes) -> StorageResult<()> {
        let mut file = self.open_new(id, "create").await?;
        file.write_all(&data)
            .await
            .map_err(|e| StorageError::backend("create", id, e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::backend("create", id, e))
    }

    async fn create_stream(
        &self,
        id: &dyn StorageId,
        mut data: ByteStream,
        _len: u64,
    ) -> StorageResult<()> {
        let mut file = self.open_new(id, "create_stream").await?;
        while let Some(chunk) = data.next().await {
            file.write_all(&chunk?)
                .await
                .map_err(|e| StorageError::backend("create_stream", id, e))?;
        }
        file.flush()
            .await
            .map_err(|e| StorageError::backend("create_stream", id, e))
    }

    async fn delete(&self, id: &dyn StorageId) -> StorageResult<()> {
        match fs::remove_file(self.blob_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found("delete", id))
            }
            Err(e) => Err(StorageError::backend("delete", id, e)),
        }
    }

    async fn get_bytes(&self, id: &dyn StorageId) -> StorageResult<Bytes> {
        match fs::read(self.blob_path(id)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found("get_bytes", id))
            }
            Err(e) => Err(StorageError::backend("get_bytes", id, e)),
        }
    }

    async fn get_range(&self, id: &dyn StorageId, start: u64, end: u64) -> StorageResult<Bytes> {
        if start > end {
            return Err(StorageError::invalid_range("get_range", id, start, end));
        }
        let mut file = match fs::File::open(self.blob_path(id)).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found("get_range", id));
            }
            Err(e) => return Err(StorageError::backend("get_range", id, e)),
        };

        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| StorageError::backend("get_range", id, e))?;
        let mut buf = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| StorageError::backend("get_range", id, e))?;
        Ok(Bytes::from(buf))
    }

    async fn get_stream(&self, id: &dyn StorageId) -> StorageResult<ByteStream> {
        let file = match fs::File::open(self.blob_path(id)).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found("get_stream", id));
            }
            Err(e) => return Err(StorageError::backend("get_stream", id, e)),
        };

        let id_str = id.to_string();
        let stream = stream::try_unfold((file, id_str), |(mut file, id_str)| async move {
            let mut buf = vec![0u8; STREAM_CHUNK];
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| StorageError::backend("get_stream", &id_str, e))?;
            if n == 0 {
                Ok(None)
            } else {
                buf.truncate(n);
                Ok(Some((Bytes::from(buf), (file, id_str))))
            }
        });
        Ok(Box::pin(stream))
    }

    async fn delete_all(&self) -> StorageResult<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::backend("delete_all", self.root.display(), e)),
        }
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::backend("delete_all", self.root.display(), e))
    }
}
