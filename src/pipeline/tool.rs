//! External tool contracts
//!
//! Extraction tools (NER, relationship extractors, embedding generators)
//! are external collaborators. They produce raw typed spans; the caller
//! feeds those through the identity service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by external tools
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool failed: {0}")]
    Failed(String),

    #[error("tool produced invalid output: {0}")]
    InvalidOutput(String),
}

/// A raw extraction result: a typed span with its location and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Semantic type assigned by the extractor (e.g. "ORGANIZATION")
    pub span_type: String,
    /// Extractor confidence in [0, 1]
    pub confidence: f32,
}

/// The contract extraction tools implement.
#[async_trait]
pub trait ExtractionTool: Send + Sync {
    /// Unique identifier for this tool, used in provenance records
    fn id(&self) -> &str;

    /// Extract typed spans from a chunk of text.
    async fn extract(&self, chunk_text: &str) -> Result<Vec<RawSpan>, ToolError>;
}
