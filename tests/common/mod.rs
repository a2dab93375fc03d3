//! Shared fixtures for integration tests
//!
//! Builds the full service stack over either the in-memory stores or a
//! SQLite relational store, wired the way an embedding process would wire it.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use weft::{
    IdentityService, MemoryGraphStore, MemoryRelationalStore, MemoryVectorIndex, PipelineRunner,
    ProvenanceService, QualityService, ReferenceResolver, RelationalStore, SqliteRelationalStore,
    UniversalReference, WorkflowStateService,
};

pub struct Stack {
    pub graph: Arc<MemoryGraphStore>,
    pub relational: Arc<dyn RelationalStore>,
    pub vector: Arc<MemoryVectorIndex>,
    pub resolver: ReferenceResolver,
    pub identity: Arc<IdentityService>,
    pub quality: Arc<QualityService>,
    pub provenance: Arc<ProvenanceService>,
    pub workflow: Arc<WorkflowStateService>,
    pub runner: PipelineRunner,
}

pub fn memory_stack() -> Stack {
    build(Arc::new(MemoryRelationalStore::new()))
}

pub fn sqlite_stack(path: &Path) -> Stack {
    build(Arc::new(SqliteRelationalStore::open(path).unwrap()))
}

fn build(relational: Arc<dyn RelationalStore>) -> Stack {
    let graph = Arc::new(MemoryGraphStore::new());
    let vector = Arc::new(MemoryVectorIndex::new());
    let resolver = ReferenceResolver::new(graph.clone(), relational.clone(), vector.clone());
    let identity = Arc::new(IdentityService::new(graph.clone(), relational.clone()));
    let quality = Arc::new(QualityService::new(
        graph.clone(),
        relational.clone(),
        resolver.clone(),
    ));
    let provenance = Arc::new(ProvenanceService::new(
        relational.clone(),
        quality.clone(),
        resolver.clone(),
    ));
    let workflow = Arc::new(WorkflowStateService::new(relational.clone()));
    let runner = PipelineRunner::new(provenance.clone(), workflow.clone());
    Stack {
        graph,
        relational,
        vector,
        resolver,
        identity,
        quality,
        provenance,
        workflow,
        runner,
    }
}

impl Stack {
    /// Register a chunk root and return its reference.
    pub fn chunk(&self, id: &str) -> UniversalReference {
        self.relational.register_chunk(id, None).unwrap();
        UniversalReference::chunk(id)
    }

    /// Mint surface form + mention for a span, returning the mention ref.
    pub fn mention(
        &self,
        chunk: &UniversalReference,
        text: &str,
        start: usize,
        mention_type: &str,
        confidence: f32,
    ) -> UniversalReference {
        let sf = self
            .identity
            .create_surface_form(text, "test context", chunk, start, start + text.len())
            .unwrap();
        self.identity
            .create_mention(&sf, mention_type, Default::default(), confidence)
            .unwrap()
    }
}
