//! Storage abstraction traits
//!
//! This module defines the byte-store traits the assembly pipeline builds on:
//! [`ChunkStore`] for per-upload chunk staging and [`ArtifactStore`] for the
//! merged document files.

use async_trait::async_trait;
use bytes::Bytes;
use docpipe_core::AppError;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::WriteFailed(msg)
            | StorageError::ReadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::ConfigError(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
        }
    }
}

/// Boxed async reader returned by streaming reads.
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Per-upload chunk staging area.
///
/// Chunks are keyed by `(upload_name, index)`. Writes for different indices
/// of the same upload may run concurrently; a re-upload of the same index
/// overwrites the previous bytes.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Write one chunk, creating the upload's staging directory if absent.
    async fn put_chunk(&self, upload_name: &str, index: u32, data: Bytes) -> StorageResult<()>;

    /// Indices currently present for an upload, in no particular order.
    async fn list_indices(&self, upload_name: &str) -> StorageResult<Vec<u32>>;

    /// Open one chunk for streaming reads.
    async fn open_chunk(&self, upload_name: &str, index: u32) -> StorageResult<ByteReader>;

    /// Remove the staging directory and all chunk files. Succeeds if the
    /// directory is already absent.
    async fn purge(&self, upload_name: &str) -> StorageResult<()>;
}

/// Store for merged document files.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stream `reader` into a new file, returning its path and byte size.
    /// An existing file with the same name is overwritten.
    async fn put_stream(&self, file_name: &str, reader: ByteReader)
        -> StorageResult<(String, u64)>;

    /// Read up to `len` bytes from the start of a stored file.
    async fn read_head(&self, file_name: &str, len: usize) -> StorageResult<Vec<u8>>;

    /// Delete a stored file. Succeeds if the file is already absent.
    async fn delete(&self, file_name: &str) -> StorageResult<()>;

    /// Check whether a file exists.
    async fn exists(&self, file_name: &str) -> StorageResult<bool>;
}
