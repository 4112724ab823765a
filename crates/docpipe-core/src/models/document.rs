use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of document types accepted by the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    Pdf,
    Docx,
    Xlsx,
}

impl DocumentType {
    /// Resolve a type from a filename extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "pdf" => Some(DocumentType::Pdf),
            "docx" => Some(DocumentType::Docx),
            "xlsx" => Some(DocumentType::Xlsx),
            _ => None,
        }
    }

    /// Resolve a type from a MIME type string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(DocumentType::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentType::Docx)
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(DocumentType::Xlsx)
            }
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "application/pdf",
            DocumentType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentType::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl Display for DocumentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DocumentType::Pdf => write!(f, "PDF"),
            DocumentType::Docx => write!(f, "DOCX"),
            DocumentType::Xlsx => write!(f, "XLSX"),
        }
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PDF" => Ok(DocumentType::Pdf),
            "DOCX" => Ok(DocumentType::Docx),
            "XLSX" => Ok(DocumentType::Xlsx),
            _ => Err(anyhow::anyhow!("Invalid document type: {}", s)),
        }
    }
}

/// Lifecycle status of a stored document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Active,
    Inactive,
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DocumentStatus::Active => write!(f, "ACTIVE"),
            DocumentStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// A fully merged, validated uploaded file.
///
/// Immutable after creation except for `status` and `updated_at`. Many
/// documents may share one `unified_id`; the analysis job for that logical
/// request is keyed by the same id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub unified_id: Uuid,
    pub owner: Uuid,
    pub file_name: String,
    pub actual_file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: DocumentType,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a document row after a successful merge.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub unified_id: Uuid,
    pub owner: Uuid,
    pub file_name: String,
    pub actual_file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: DocumentType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_extension() {
        assert_eq!(DocumentType::from_extension("pdf"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_extension("PDF"), Some(DocumentType::Pdf));
        assert_eq!(
            DocumentType::from_extension("docx"),
            Some(DocumentType::Docx)
        );
        assert_eq!(
            DocumentType::from_extension("xlsx"),
            Some(DocumentType::Xlsx)
        );
        assert_eq!(DocumentType::from_extension("exe"), None);
        assert_eq!(DocumentType::from_extension(""), None);
    }

    #[test]
    fn test_document_type_mime_round_trip() {
        for ty in [DocumentType::Pdf, DocumentType::Docx, DocumentType::Xlsx] {
            assert_eq!(DocumentType::from_mime(ty.mime()), Some(ty));
        }
        assert_eq!(DocumentType::from_mime("image/png"), None);
    }

    #[test]
    fn test_document_type_display_parse() {
        assert_eq!("PDF".parse::<DocumentType>().unwrap(), DocumentType::Pdf);
        assert_eq!(DocumentType::Docx.to_string(), "DOCX");
        assert!("pdf".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&DocumentStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
        let json = serde_json::to_string(&DocumentType::Xlsx).unwrap();
        assert_eq!(json, "\"XLSX\"");
    }
}
