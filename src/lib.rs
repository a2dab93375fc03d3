//! Weft: Cross-Store Identity, Provenance & Quality Layer
//!
//! A bookkeeping layer for document knowledge pipelines that persist data
//! across three heterogeneous stores: a graph store (entities), a relational
//! store (surface forms, mentions, operations, checkpoints), and a vector
//! index (embeddings). Weft keeps the three stores consistent, traceable,
//! and quality-scored as data flows through multi-step pipelines with
//! partial failures.
//!
//! # Core Concepts
//!
//! - **References**: typed cross-store pointers (`graphstore://entity/ent_x`)
//! - **Identity**: surface form → mention → canonical entity deduplication
//! - **Provenance**: an auditable operation DAG linking outputs to inputs
//! - **Quality**: confidence scores that degrade as data moves through operations
//! - **Workflow state**: resumable checkpoints for long-running pipelines
//!
//! # Example
//!
//! ```
//! use weft::{IdentityService, MemoryGraphStore, MemoryRelationalStore};
//! use std::sync::Arc;
//!
//! let graph = Arc::new(MemoryGraphStore::new());
//! let relational = Arc::new(MemoryRelationalStore::new());
//! let identity = IdentityService::new(graph, relational);
//! // Services are ready for use
//! ```

mod error;
pub mod identity;
pub mod model;
pub mod observe;
pub mod pipeline;
pub mod provenance;
pub mod quality;
pub mod reference;
pub mod storage;
pub mod workflow;

pub use error::{WeftError, WeftResult};
pub use identity::IdentityService;
pub use model::{
    Entity, EntityStatus, Mention, OperationStatus, ProvenanceRecord, QualityTier, SurfaceForm,
    ToolStatistics, WorkflowCheckpoint, WorkflowStatus,
};
pub use pipeline::{
    reconcile_orphans, ExtractionTool, OrphanedRef, PipelineRunner, RawSpan, ReconciliationReport,
    StepOutcome, StepOutput, ToolError, ToolStep, WorkflowBinding,
};
pub use provenance::{LineageDirection, ProvenanceService};
pub use quality::{AssessmentMethod, QualityAssessment, QualityConfig, QualityService};
pub use reference::{ObjectType, ParseError, ReferenceResolver, Store, UniversalReference};
pub use storage::{
    GraphStore, MemoryGraphStore, MemoryRelationalStore, MemoryVectorIndex, RelationalStore,
    SqliteRelationalStore, StorageError, StorageResult, VectorIndex,
};
pub use workflow::{WorkflowProgress, WorkflowStateService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
