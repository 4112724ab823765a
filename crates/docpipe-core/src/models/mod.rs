pub mod analysis;
pub mod caller;
pub mod document;

pub use analysis::{AnalysisJob, AnalysisStatus, NewAnalysisJob};
pub use caller::{Caller, UserRole};
pub use document::{Document, DocumentStatus, DocumentType, NewDocument};
