//! Business services for docpipe: chunk assembly, the analysis job
//! lifecycle, and the outbound analysis client.

pub mod analysis;
pub mod assembler;
pub mod claims;
pub mod client;

pub use analysis::{AnalysisResult, AnalysisService};
pub use assembler::{ChunkAssembler, ChunkIngest};
pub use claims::{ClaimSet, KeyedLock};
pub use client::{AnalysisClient, AnalysisClientError, HttpAnalysisClient};
