//! Store trait definitions

use crate::model::{
    Entity, Mention, OperationStatus, ProvenanceRecord, SurfaceForm, ToolStatistics,
    WorkflowCheckpoint,
};
use crate::reference::UniversalReference;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("date parsing error: {0}")]
    DateParse(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Graph store contract — persists entities as nodes.
///
/// Implementations must be thread-safe (Send + Sync) to support concurrent
/// pipeline workers. Node creation is keyed on the entity's resolution key:
/// two concurrent creates with the same key must converge on one node, with
/// the loser receiving the winner's entity rather than an error.
pub trait GraphStore: Send + Sync {
    /// Create a node for the entity, unique per resolution key.
    ///
    /// Returns the stored entity: the caller's on a fresh insert, the
    /// already-present active entity when the key is taken.
    fn create_node(&self, entity: &Entity) -> StorageResult<Entity>;

    /// Load a node by entity id.
    fn get_node(&self, id: &str) -> StorageResult<Option<Entity>>;

    /// Overwrite an existing node (confidence, mentions, status updates).
    fn update_node(&self, entity: &Entity) -> StorageResult<()>;

    /// Upsert a relationship edge between two nodes.
    fn merge_edge(&self, source_id: &str, target_id: &str, relationship: &str)
        -> StorageResult<()>;

    /// Delete a node. Returns false if it did not exist.
    fn delete_node(&self, id: &str) -> StorageResult<bool>;

    /// Index lookup: active entities sharing a resolution key.
    fn find_by_key(&self, resolution_key: &str) -> StorageResult<Vec<Entity>>;

    /// Existence check that never loads the payload.
    fn node_exists(&self, id: &str) -> StorageResult<bool>;
}

/// Relational store contract — surface forms, mentions, provenance records
/// (with their input/output join rows), tool statistics, and checkpoints.
///
/// Minting methods are atomic per unique key: a concurrent loser receives
/// the winner's stored row. Reads see only fully written rows.
pub trait RelationalStore: Send + Sync {
    // === Documents & chunks (externally produced roots) ===

    /// Register a document id so references to it resolve.
    fn register_document(&self, id: &str) -> StorageResult<()>;

    /// Register a chunk id, optionally tied to a document.
    fn register_chunk(&self, id: &str, document_id: Option<&str>) -> StorageResult<()>;

    // === Surface forms ===

    /// Insert a surface form if its id is free; return the stored row either way.
    fn mint_surface_form(&self, form: &SurfaceForm) -> StorageResult<SurfaceForm>;

    fn get_surface_form(&self, id: &str) -> StorageResult<Option<SurfaceForm>>;

    // === Mentions ===

    /// Insert a mention if its id is free; return the stored row either way.
    fn mint_mention(&self, mention: &Mention) -> StorageResult<Mention>;

    fn get_mention(&self, id: &str) -> StorageResult<Option<Mention>>;

    /// Overwrite a mention (confidence updates from quality folding).
    fn update_mention(&self, mention: &Mention) -> StorageResult<()>;

    // === Provenance records ===

    /// Insert a freshly started (running) record with its input join rows.
    fn insert_operation(&self, record: &ProvenanceRecord) -> StorageResult<()>;

    fn get_operation(&self, id: &str) -> StorageResult<Option<ProvenanceRecord>>;

    /// Atomically transition a running record to its completed/failed form,
    /// writing output join rows. Returns false if the record was not in the
    /// `running` state (the transition is one-shot).
    fn transition_operation(&self, record: &ProvenanceRecord) -> StorageResult<bool>;

    /// Operations whose outputs contain the reference.
    fn operations_producing(&self, r: &UniversalReference) -> StorageResult<Vec<ProvenanceRecord>>;

    /// Operations whose inputs contain the reference.
    fn operations_consuming(&self, r: &UniversalReference) -> StorageResult<Vec<ProvenanceRecord>>;

    /// All operations currently in the given status.
    fn operations_by_status(&self, status: OperationStatus)
        -> StorageResult<Vec<ProvenanceRecord>>;

    // === Tool statistics ===

    /// Fold one finished call into the tool's aggregate row.
    fn record_tool_call(&self, tool_id: &str, success: bool, duration_ms: i64)
        -> StorageResult<()>;

    /// Read the aggregate row; None if the tool was never called.
    fn get_tool_statistics(&self, tool_id: &str) -> StorageResult<Option<ToolStatistics>>;

    // === Checkpoints ===

    /// Upsert the checkpoint for its workflow (one row per workflow id).
    fn save_checkpoint(&self, checkpoint: &WorkflowCheckpoint) -> StorageResult<()>;

    fn load_checkpoint(&self, workflow_id: &str) -> StorageResult<Option<WorkflowCheckpoint>>;

    // === Existence ===

    /// Existence check for any relational-owned reference; never loads payload.
    fn ref_exists(&self, r: &UniversalReference) -> StorageResult<bool>;
}

/// Vector index contract — owns embeddings, referenced but never embedded
/// inline in the other stores.
pub trait VectorIndex: Send + Sync {
    /// Add vectors with their owning references. Lengths must match.
    fn add_vectors(
        &self,
        vectors: &[Vec<f32>],
        refs: &[UniversalReference],
    ) -> StorageResult<()>;

    /// K-nearest search; returns (reference, similarity) pairs, best first.
    fn search_similar(
        &self,
        vector: &[f32],
        k: usize,
    ) -> StorageResult<Vec<(UniversalReference, f32)>>;

    /// Existence check by vector id.
    fn vector_exists(&self, id: &str) -> StorageResult<bool>;
}
