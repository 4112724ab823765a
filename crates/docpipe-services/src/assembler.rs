//! Chunk assembly: accepts out-of-order chunk uploads for a named file and
//! produces one merged, validated document exactly once.

use bytes::Bytes;
use docpipe_core::models::{Caller, Document, DocumentType, NewDocument};
use docpipe_core::AppError;
use docpipe_db::DocumentRepository;
use docpipe_storage::{ArtifactStore, ByteReader, ChunkStore};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::claims::ClaimSet;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const SNIFF_LEN: usize = 8;

/// One uploaded chunk plus its sidecar metadata.
#[derive(Debug, Clone)]
pub struct ChunkIngest {
    /// Logical id shared by all chunks and documents of one upload.
    pub unified_id: Uuid,
    /// Generated file name, unique per physical file; doubles as the upload name.
    pub file_name: String,
    /// Original display name.
    pub actual_file_name: String,
    /// Declared total file size in bytes.
    pub declared_size: i64,
    pub total_chunks: u32,
    /// Zero-based chunk index.
    pub index: u32,
    pub data: Bytes,
}

pub struct ChunkAssembler {
    chunks: Arc<dyn ChunkStore>,
    artifacts: Arc<dyn ArtifactStore>,
    documents: Arc<dyn DocumentRepository>,
    merges: ClaimSet,
}

impl ChunkAssembler {
    pub fn new(
        chunks: Arc<dyn ChunkStore>,
        artifacts: Arc<dyn ArtifactStore>,
        documents: Arc<dyn DocumentRepository>,
    ) -> Self {
        Self {
            chunks,
            artifacts,
            documents,
            merges: ClaimSet::new(),
        }
    }

    /// Store one chunk and, when the set is complete, merge, validate, and
    /// record the document. Returns `None` while the upload is incomplete or
    /// when another task already won the merge for this upload.
    pub async fn ingest(
        &self,
        req: ChunkIngest,
        caller: &Caller,
    ) -> Result<Option<Document>, AppError> {
        if req.total_chunks == 0 {
            return Err(AppError::InvalidInput(
                "Total chunk count must be greater than 0".to_string(),
            ));
        }
        if req.index >= req.total_chunks {
            return Err(AppError::InvalidInput(format!(
                "Chunk index {} out of range for {} chunks",
                req.index, req.total_chunks
            )));
        }

        self.chunks
            .put_chunk(&req.file_name, req.index, req.data.clone())
            .await?;

        let received = self.chunks.list_indices(&req.file_name).await?;
        if received.len() != req.total_chunks as usize {
            tracing::debug!(
                upload = %req.file_name,
                received = received.len(),
                total = req.total_chunks,
                "Upload incomplete"
            );
            return Ok(None);
        }

        // Exclusive per-upload claim: of two tasks that both observed a
        // complete set, exactly one merges; the other backs off.
        let Some(_claim) = self.merges.try_claim(&req.file_name) else {
            tracing::debug!(upload = %req.file_name, "Merge already in progress for upload");
            return Ok(None);
        };

        // Re-check under the claim: a finished merge purges the staging
        // directory, so a late duplicate observes an incomplete set here.
        let mut received = self.chunks.list_indices(&req.file_name).await?;
        if received.len() != req.total_chunks as usize {
            return Ok(None);
        }
        received.sort_unstable();

        let result = self.merge_and_record(&req, &received, caller).await;

        if let Err(purge_err) = self.chunks.purge(&req.file_name).await {
            tracing::warn!(
                upload = %req.file_name,
                error = %purge_err,
                "Failed to purge chunk staging"
            );
        }

        match result {
            Ok(document) => {
                tracing::info!(
                    upload = %req.file_name,
                    document_id = %document.id,
                    unified_id = %req.unified_id,
                    size_bytes = document.file_size,
                    file_type = %document.file_type,
                    "Upload merged and recorded"
                );
                Ok(Some(document))
            }
            Err(err) => {
                // A failed merge leaves no partial output behind.
                if let Err(delete_err) = self.artifacts.delete(&req.file_name).await {
                    tracing::warn!(
                        upload = %req.file_name,
                        error = %delete_err,
                        "Failed to remove merge output after error"
                    );
                }
                Err(err)
            }
        }
    }

    async fn merge_and_record(
        &self,
        req: &ChunkIngest,
        indices: &[u32],
        caller: &Caller,
    ) -> Result<Document, AppError> {
        // Chunks are concatenated strictly by ascending numeric index;
        // arrival order and directory listing order never affect the output.
        let mut combined: ByteReader = Box::pin(tokio::io::empty());
        for &index in indices {
            let chunk = self.chunks.open_chunk(&req.file_name, index).await?;
            combined = Box::pin(combined.chain(chunk));
        }

        let (file_path, size) = self.artifacts.put_stream(&req.file_name, combined).await?;

        if req.declared_size > 0 && size > req.declared_size as u64 {
            return Err(AppError::InvalidInput(format!(
                "Merged file size {} bytes exceeds declared size {} bytes",
                size, req.declared_size
            )));
        }

        let file_type = self.detect_type(&req.file_name).await?;

        let document = self
            .documents
            .create(NewDocument {
                unified_id: req.unified_id,
                owner: caller.user_id,
                file_name: req.file_name.clone(),
                actual_file_name: req.actual_file_name.clone(),
                file_path,
                file_size: size as i64,
                file_type,
            })
            .await?;

        Ok(document)
    }

    /// Resolve the document type from the filename extension and cross-check
    /// the merged file's magic bytes.
    async fn detect_type(&self, file_name: &str) -> Result<DocumentType, AppError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let Some(file_type) = DocumentType::from_extension(extension) else {
            return Err(AppError::UnsupportedFileType(
                "Invalid file type. Only PDF, DOCX, and XLSX are allowed".to_string(),
            ));
        };

        let head = self.artifacts.read_head(file_name, SNIFF_LEN).await?;
        let magic_ok = match file_type {
            DocumentType::Pdf => head.starts_with(PDF_MAGIC),
            // DOCX and XLSX are both ZIP containers; the extension picks
            // between them, the magic confirms the container.
            DocumentType::Docx | DocumentType::Xlsx => head.starts_with(ZIP_MAGIC),
        };

        if !magic_ok {
            return Err(AppError::UnsupportedFileType(format!(
                "File content does not match the {} extension",
                file_type
            )));
        }

        Ok(file_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_core::models::UserRole;
    use docpipe_db::InMemoryDocumentRepository;
    use docpipe_storage::{LocalArtifactStore, LocalChunkStore};
    use tempfile::TempDir;

    struct Fixture {
        assembler: ChunkAssembler,
        artifacts: Arc<LocalArtifactStore>,
        chunks: Arc<LocalChunkStore>,
        documents: Arc<InMemoryDocumentRepository>,
        _tmp: TempDir,
    }

    async fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let chunks = Arc::new(LocalChunkStore::new(tmp.path().join("chunk")).await.unwrap());
        let artifacts = Arc::new(
            LocalArtifactStore::new(tmp.path().join("files"))
                .await
                .unwrap(),
        );
        let documents = Arc::new(InMemoryDocumentRepository::new());
        let assembler = ChunkAssembler::new(
            chunks.clone() as Arc<dyn ChunkStore>,
            artifacts.clone() as Arc<dyn ArtifactStore>,
            documents.clone() as Arc<dyn DocumentRepository>,
        );
        Fixture {
            assembler,
            artifacts,
            chunks,
            documents,
            _tmp: tmp,
        }
    }

    fn editor() -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            email: "editor@example.com".to_string(),
            name: "Editor".to_string(),
            role: UserRole::Editor,
        }
    }

    fn chunk(
        unified_id: Uuid,
        file_name: &str,
        total: u32,
        index: u32,
        data: &[u8],
    ) -> ChunkIngest {
        ChunkIngest {
            unified_id,
            file_name: file_name.to_string(),
            actual_file_name: "report.pdf".to_string(),
            declared_size: 0,
            total_chunks: total,
            index,
            data: Bytes::copy_from_slice(data),
        }
    }

    async fn merged_bytes(fx: &Fixture, file_name: &str) -> Vec<u8> {
        fx.artifacts.read_head(file_name, 1 << 20).await.unwrap()
    }

    #[tokio::test]
    async fn test_out_of_order_arrival_merges_in_index_order() {
        let fx = fixture().await;
        let caller = editor();
        let unified_id = Uuid::new_v4();

        // Sizes 10/10/5, arriving as indices 2, 0, 1
        let parts: [&[u8]; 3] = [b"%PDF-12345", b"abcdefghij", b"tail!"];

        assert!(fx
            .assembler
            .ingest(chunk(unified_id, "f.pdf", 3, 2, parts[2]), &caller)
            .await
            .unwrap()
            .is_none());
        assert!(fx
            .assembler
            .ingest(chunk(unified_id, "f.pdf", 3, 0, parts[0]), &caller)
            .await
            .unwrap()
            .is_none());

        let document = fx
            .assembler
            .ingest(chunk(unified_id, "f.pdf", 3, 1, parts[1]), &caller)
            .await
            .unwrap()
            .expect("third chunk completes the upload");

        assert_eq!(document.file_size, 25);
        assert_eq!(document.file_type, DocumentType::Pdf);
        assert_eq!(document.unified_id, unified_id);
        assert_eq!(document.owner, caller.user_id);

        let merged = merged_bytes(&fx, "f.pdf").await;
        assert_eq!(merged, b"%PDF-12345abcdefghijtail!".to_vec());

        // Staging is gone after a successful merge
        assert!(fx.chunks.list_indices("f.pdf").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_arrival_permutation_produces_identical_bytes() {
        let parts: [&[u8]; 3] = [b"%PDF-head", b"-middle-", b"end"];
        let expected = b"%PDF-head-middle-end".to_vec();

        let permutations: [[u32; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in permutations {
            let fx = fixture().await;
            let caller = editor();
            let unified_id = Uuid::new_v4();

            let mut last = None;
            for index in order {
                last = fx
                    .assembler
                    .ingest(
                        chunk(unified_id, "p.pdf", 3, index, parts[index as usize]),
                        &caller,
                    )
                    .await
                    .unwrap();
            }

            assert!(last.is_some(), "arrival order {:?} did not complete", order);
            assert_eq!(
                merged_bytes(&fx, "p.pdf").await,
                expected,
                "arrival order {:?} changed the merged bytes",
                order
            );
        }
    }

    #[tokio::test]
    async fn test_reupload_of_same_index_last_write_wins() {
        let fx = fixture().await;
        let caller = editor();
        let unified_id = Uuid::new_v4();

        assert!(fx
            .assembler
            .ingest(chunk(unified_id, "w.pdf", 2, 0, b"%PDF-old"), &caller)
            .await
            .unwrap()
            .is_none());
        // Same index again with different bytes; still counts once
        assert!(fx
            .assembler
            .ingest(chunk(unified_id, "w.pdf", 2, 0, b"%PDF-new"), &caller)
            .await
            .unwrap()
            .is_none());

        let document = fx
            .assembler
            .ingest(chunk(unified_id, "w.pdf", 2, 1, b"rest"), &caller)
            .await
            .unwrap()
            .expect("upload completes");

        assert_eq!(merged_bytes(&fx, "w.pdf").await, b"%PDF-newrest".to_vec());
        assert_eq!(document.file_size, 12);
    }

    #[tokio::test]
    async fn test_concurrent_final_chunks_merge_exactly_once() {
        let fx = fixture().await;
        let fx = Arc::new(fx);
        let caller = editor();
        let unified_id = Uuid::new_v4();

        fx.assembler
            .ingest(chunk(unified_id, "c.pdf", 3, 0, b"%PDF-a"), &caller)
            .await
            .unwrap();
        fx.assembler
            .ingest(chunk(unified_id, "c.pdf", 3, 1, b"bb"), &caller)
            .await
            .unwrap();

        let (left, right) = tokio::join!(
            fx.assembler
                .ingest(chunk(unified_id, "c.pdf", 3, 2, b"cc"), &caller),
            fx.assembler
                .ingest(chunk(unified_id, "c.pdf", 3, 2, b"cc"), &caller),
        );

        let completed = [left.unwrap(), right.unwrap()]
            .into_iter()
            .flatten()
            .count();
        assert_eq!(completed, 1, "exactly one completer must win the merge");

        let (_, count) = fx.documents.list(10, 0, None).await.unwrap();
        assert_eq!(count, 1, "exactly one document row persisted");
    }

    #[tokio::test]
    async fn test_late_duplicate_after_merge_does_not_remerge() {
        let fx = fixture().await;
        let caller = editor();
        let unified_id = Uuid::new_v4();

        fx.assembler
            .ingest(chunk(unified_id, "d.pdf", 2, 0, b"%PDF-x"), &caller)
            .await
            .unwrap();
        let first = fx
            .assembler
            .ingest(chunk(unified_id, "d.pdf", 2, 1, b"y"), &caller)
            .await
            .unwrap();
        assert!(first.is_some());

        // A delayed retry of an already-counted chunk arrives after the merge
        let late = fx
            .assembler
            .ingest(chunk(unified_id, "d.pdf", 2, 1, b"y"), &caller)
            .await
            .unwrap();
        assert!(late.is_none());

        let (_, count) = fx.documents.list(10, 0, None).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected_and_cleaned_up() {
        let fx = fixture().await;
        let caller = editor();
        let unified_id = Uuid::new_v4();

        let err = fx
            .assembler
            .ingest(chunk(unified_id, "notes.txt", 1, 0, b"hello"), &caller)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));

        assert!(fx.chunks.list_indices("notes.txt").await.unwrap().is_empty());
        assert!(!fx.artifacts.exists("notes.txt").await.unwrap());
        let (_, count) = fx.documents.list(10, 0, None).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_content_not_matching_extension_rejected() {
        let fx = fixture().await;
        let caller = editor();

        let err = fx
            .assembler
            .ingest(
                chunk(Uuid::new_v4(), "fake.pdf", 1, 0, b"MZ\x90\x00 not a pdf"),
                &caller,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));
        assert!(!fx.artifacts.exists("fake.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_zip_container_accepted_for_docx_and_xlsx() {
        let fx = fixture().await;
        let caller = editor();

        let docx = fx
            .assembler
            .ingest(
                chunk(Uuid::new_v4(), "a.docx", 1, 0, b"PK\x03\x04rest-of-zip"),
                &caller,
            )
            .await
            .unwrap()
            .expect("docx accepted");
        assert_eq!(docx.file_type, DocumentType::Docx);

        let xlsx = fx
            .assembler
            .ingest(
                chunk(Uuid::new_v4(), "b.xlsx", 1, 0, b"PK\x03\x04rest-of-zip"),
                &caller,
            )
            .await
            .unwrap()
            .expect("xlsx accepted");
        assert_eq!(xlsx.file_type, DocumentType::Xlsx);
    }

    #[tokio::test]
    async fn test_merged_size_exceeding_declared_size_rejected() {
        let fx = fixture().await;
        let caller = editor();

        let mut req = chunk(Uuid::new_v4(), "big.pdf", 1, 0, b"%PDF-0123456789");
        req.declared_size = 4;

        let err = fx.assembler.ingest(req, &caller).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(!fx.artifacts.exists("big.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_index_out_of_range_rejected() {
        let fx = fixture().await;
        let caller = editor();

        let err = fx
            .assembler
            .ingest(chunk(Uuid::new_v4(), "r.pdf", 2, 2, b"x"), &caller)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = fx
            .assembler
            .ingest(chunk(Uuid::new_v4(), "r.pdf", 0, 0, b"x"), &caller)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
