//! Reference resolution against the owning stores

use super::types::{Store, UniversalReference};
use crate::storage::{GraphStore, RelationalStore, StorageResult, VectorIndex};
use std::sync::Arc;

/// Resolves references to their owning store.
///
/// `parse`/`format` are pure (see [`UniversalReference`]); `exists` is the
/// one effectful operation, delegating to the owning store's existence check
/// without ever loading the payload.
#[derive(Clone)]
pub struct ReferenceResolver {
    graph: Arc<dyn GraphStore>,
    relational: Arc<dyn RelationalStore>,
    vector: Arc<dyn VectorIndex>,
}

impl ReferenceResolver {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        relational: Arc<dyn RelationalStore>,
        vector: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            graph,
            relational,
            vector,
        }
    }

    /// Whether the referenced object exists in its owning store.
    pub fn exists(&self, r: &UniversalReference) -> StorageResult<bool> {
        match r.store() {
            Store::Graph => self.graph.node_exists(r.id()),
            Store::Relational => self.relational.ref_exists(r),
            Store::Vector => self.vector.vector_exists(r.id()),
        }
    }
}
