use crate::traits::{ArtifactStore, ByteReader, ChunkStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const CHUNK_FILE_PREFIX: &str = "chunk_";

/// Validate that a name is a single path component that cannot escape the
/// base directory.
fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid storage name: {:?}",
            name
        )));
    }
    Ok(())
}

/// Local filesystem chunk staging: one directory per upload name, one
/// `chunk_<index>` file per chunk.
#[derive(Clone)]
pub struct LocalChunkStore {
    base_path: PathBuf,
}

impl LocalChunkStore {
    /// Create a new LocalChunkStore rooted at `base_path`, creating the
    /// directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create chunk directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalChunkStore { base_path })
    }

    fn upload_dir(&self, upload_name: &str) -> StorageResult<PathBuf> {
        validate_name(upload_name)?;
        Ok(self.base_path.join(upload_name))
    }

    fn chunk_path(&self, upload_name: &str, index: u32) -> StorageResult<PathBuf> {
        Ok(self
            .upload_dir(upload_name)?
            .join(format!("{}{}", CHUNK_FILE_PREFIX, index)))
    }
}

#[async_trait]
impl ChunkStore for LocalChunkStore {
    async fn put_chunk(&self, upload_name: &str, index: u32, data: Bytes) -> StorageResult<()> {
        let dir = self.upload_dir(upload_name)?;
        let path = self.chunk_path(upload_name, index)?;

        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create chunk {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write chunk {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync chunk {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            upload = %upload_name,
            index = index,
            size_bytes = data.len(),
            "Chunk written"
        );

        Ok(())
    }

    async fn list_indices(&self, upload_name: &str) -> StorageResult<Vec<u32>> {
        let dir = self.upload_dir(upload_name)?;

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to list staging directory {}: {}",
                    dir.display(),
                    e
                )))
            }
        };

        let mut indices = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            StorageError::ReadFailed(format!(
                "Failed to read staging directory {}: {}",
                dir.display(),
                e
            ))
        })? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(index) = name
                .strip_prefix(CHUNK_FILE_PREFIX)
                .and_then(|s| s.parse::<u32>().ok())
            {
                indices.push(index);
            }
        }

        Ok(indices)
    }

    async fn open_chunk(&self, upload_name: &str, index: u32) -> StorageResult<ByteReader> {
        let path = self.chunk_path(upload_name, index)?;

        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("{}/{}{}", upload_name, CHUNK_FILE_PREFIX, index))
            } else {
                StorageError::ReadFailed(format!(
                    "Failed to open chunk {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        Ok(Box::pin(file))
    }

    async fn purge(&self, upload_name: &str) -> StorageResult<()> {
        let dir = self.upload_dir(upload_name)?;

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(upload = %upload_name, "Chunk staging purged");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to purge staging directory {}: {}",
                dir.display(),
                e
            ))),
        }
    }
}

/// Local filesystem store for merged document files.
#[derive(Clone)]
pub struct LocalArtifactStore {
    base_path: PathBuf,
}

impl LocalArtifactStore {
    /// Create a new LocalArtifactStore rooted at `base_path`, creating the
    /// directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create files directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalArtifactStore { base_path })
    }

    fn file_path(&self, file_name: &str) -> StorageResult<PathBuf> {
        validate_name(file_name)?;
        Ok(self.base_path.join(file_name))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put_stream(
        &self,
        file_name: &str,
        mut reader: ByteReader,
    ) -> StorageResult<(String, u64)> {
        let path = self.file_path(file_name)?;
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Merged file stored"
        );

        Ok((path.display().to_string(), bytes_copied))
    }

    async fn read_head(&self, file_name: &str, len: usize) -> StorageResult<Vec<u8>> {
        let path = self.file_path(file_name)?;

        let mut file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(file_name.to_string())
            } else {
                StorageError::ReadFailed(format!("Failed to open file {}: {}", path.display(), e))
            }
        })?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = file.read(&mut buf[filled..]).await.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
            })?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        Ok(buf)
    }

    async fn delete(&self, file_name: &str) -> StorageResult<()> {
        let path = self.file_path(file_name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Merged file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, file_name: &str) -> StorageResult<bool> {
        let path = self.file_path(file_name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}
