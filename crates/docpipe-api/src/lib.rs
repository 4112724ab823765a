//! docpipe HTTP API: chunked document ingestion and the analysis job
//! lifecycle over axum.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
