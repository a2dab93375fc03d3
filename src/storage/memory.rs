//! In-memory store backends
//!
//! DashMap-backed reference implementations of all three store contracts.
//! Useful for tests and single-process deployments; minting atomicity rides
//! on DashMap's per-key entry locking.

use super::traits::{GraphStore, RelationalStore, StorageError, StorageResult, VectorIndex};
use crate::model::{
    Entity, Mention, OperationStatus, ProvenanceRecord, SurfaceForm, ToolStatistics,
    WorkflowCheckpoint,
};
use crate::reference::{ObjectType, UniversalReference};
use chrono::Utc;
use dashmap::DashMap;

/// A stored relationship edge between two entity nodes
#[derive(Debug, Clone)]
struct GraphEdge {
    target_id: String,
    relationship: String,
}

/// In-memory graph store
#[derive(Default)]
pub struct MemoryGraphStore {
    nodes: DashMap<String, Entity>,
    /// Resolution-key index: key → entity ids minted under it
    key_index: DashMap<String, Vec<String>>,
    /// Outgoing edges keyed by source node id
    edges: DashMap<String, Vec<GraphEdge>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryGraphStore {
    fn create_node(&self, entity: &Entity) -> StorageResult<Entity> {
        // The entry guard serializes concurrent minting per resolution key:
        // the loser observes the winner's id and resolves to its entity.
        let mut ids = self.key_index.entry(entity.resolution_key()).or_default();
        for id in ids.iter() {
            if let Some(existing) = self.nodes.get(id) {
                if existing.is_active() {
                    return Ok(existing.clone());
                }
            }
        }
        self.nodes.insert(entity.id.clone(), entity.clone());
        ids.push(entity.id.clone());
        Ok(entity.clone())
    }

    fn get_node(&self, id: &str) -> StorageResult<Option<Entity>> {
        Ok(self.nodes.get(id).map(|e| e.clone()))
    }

    fn update_node(&self, entity: &Entity) -> StorageResult<()> {
        match self.nodes.get_mut(&entity.id) {
            Some(mut slot) => {
                *slot = entity.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("node {}", entity.id))),
        }
    }

    fn merge_edge(
        &self,
        source_id: &str,
        target_id: &str,
        relationship: &str,
    ) -> StorageResult<()> {
        let mut outgoing = self.edges.entry(source_id.to_string()).or_default();
        let present = outgoing
            .iter()
            .any(|e| e.target_id == target_id && e.relationship == relationship);
        if !present {
            outgoing.push(GraphEdge {
                target_id: target_id.to_string(),
                relationship: relationship.to_string(),
            });
        }
        Ok(())
    }

    fn delete_node(&self, id: &str) -> StorageResult<bool> {
        let removed = self.nodes.remove(id).is_some();
        self.edges.remove(id);
        Ok(removed)
    }

    fn find_by_key(&self, resolution_key: &str) -> StorageResult<Vec<Entity>> {
        let ids = match self.key_index.get(resolution_key) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|e| e.clone()))
            .filter(|e| e.is_active())
            .collect())
    }

    fn node_exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.nodes.contains_key(id))
    }
}

/// In-memory relational store
#[derive(Default)]
pub struct MemoryRelationalStore {
    documents: DashMap<String, ()>,
    /// chunk id → owning document id
    chunks: DashMap<String, Option<String>>,
    surface_forms: DashMap<String, SurfaceForm>,
    mentions: DashMap<String, Mention>,
    operations: DashMap<String, ProvenanceRecord>,
    tool_stats: DashMap<String, ToolStatistics>,
    /// workflow id → checkpoint (one row per workflow)
    checkpoints: DashMap<String, WorkflowCheckpoint>,
    /// checkpoint id → workflow id, for existence checks by checkpoint ref
    checkpoint_ids: DashMap<String, String>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations matching a predicate, ordered by start time for
    /// deterministic traversal.
    fn operations_where<F>(&self, pred: F) -> Vec<ProvenanceRecord>
    where
        F: Fn(&ProvenanceRecord) -> bool,
    {
        let mut records: Vec<ProvenanceRecord> = self
            .operations
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.started_at);
        records
    }
}

impl RelationalStore for MemoryRelationalStore {
    fn register_document(&self, id: &str) -> StorageResult<()> {
        self.documents.insert(id.to_string(), ());
        Ok(())
    }

    fn register_chunk(&self, id: &str, document_id: Option<&str>) -> StorageResult<()> {
        self.chunks
            .insert(id.to_string(), document_id.map(|d| d.to_string()));
        Ok(())
    }

    fn mint_surface_form(&self, form: &SurfaceForm) -> StorageResult<SurfaceForm> {
        let entry = self
            .surface_forms
            .entry(form.id.clone())
            .or_insert_with(|| form.clone());
        Ok(entry.clone())
    }

    fn get_surface_form(&self, id: &str) -> StorageResult<Option<SurfaceForm>> {
        Ok(self.surface_forms.get(id).map(|f| f.clone()))
    }

    fn mint_mention(&self, mention: &Mention) -> StorageResult<Mention> {
        let entry = self
            .mentions
            .entry(mention.id.clone())
            .or_insert_with(|| mention.clone());
        Ok(entry.clone())
    }

    fn get_mention(&self, id: &str) -> StorageResult<Option<Mention>> {
        Ok(self.mentions.get(id).map(|m| m.clone()))
    }

    fn update_mention(&self, mention: &Mention) -> StorageResult<()> {
        match self.mentions.get_mut(&mention.id) {
            Some(mut slot) => {
                *slot = mention.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("mention {}", mention.id))),
        }
    }

    fn insert_operation(&self, record: &ProvenanceRecord) -> StorageResult<()> {
        if self.operations.contains_key(&record.id) {
            return Err(StorageError::Conflict(format!(
                "operation {} already exists",
                record.id
            )));
        }
        self.operations.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get_operation(&self, id: &str) -> StorageResult<Option<ProvenanceRecord>> {
        Ok(self.operations.get(id).map(|r| r.clone()))
    }

    fn transition_operation(&self, record: &ProvenanceRecord) -> StorageResult<bool> {
        // The entry guard makes the running → completed|failed transition
        // one-shot under concurrent completers.
        match self.operations.get_mut(&record.id) {
            Some(mut slot) => {
                if slot.status != OperationStatus::Running {
                    return Ok(false);
                }
                *slot = record.clone();
                Ok(true)
            }
            None => Err(StorageError::NotFound(format!("operation {}", record.id))),
        }
    }

    fn operations_producing(
        &self,
        r: &UniversalReference,
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        Ok(self.operations_where(|rec| rec.output_refs.contains(r)))
    }

    fn operations_consuming(
        &self,
        r: &UniversalReference,
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        Ok(self.operations_where(|rec| rec.input_refs.contains(r)))
    }

    fn operations_by_status(
        &self,
        status: OperationStatus,
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        Ok(self.operations_where(|rec| rec.status == status))
    }

    fn record_tool_call(
        &self,
        tool_id: &str,
        success: bool,
        duration_ms: i64,
    ) -> StorageResult<()> {
        let mut stats = self
            .tool_stats
            .entry(tool_id.to_string())
            .or_insert_with(|| ToolStatistics::empty(tool_id));
        stats.total_calls += 1;
        if success {
            stats.successful_calls += 1;
        } else {
            stats.failed_calls += 1;
        }
        stats.total_duration_ms += duration_ms;
        stats.last_used = Some(Utc::now());
        Ok(())
    }

    fn get_tool_statistics(&self, tool_id: &str) -> StorageResult<Option<ToolStatistics>> {
        Ok(self.tool_stats.get(tool_id).map(|s| s.clone()))
    }

    fn save_checkpoint(&self, checkpoint: &WorkflowCheckpoint) -> StorageResult<()> {
        self.checkpoint_ids
            .insert(checkpoint.id.clone(), checkpoint.workflow_id.clone());
        self.checkpoints
            .insert(checkpoint.workflow_id.clone(), checkpoint.clone());
        Ok(())
    }

    fn load_checkpoint(&self, workflow_id: &str) -> StorageResult<Option<WorkflowCheckpoint>> {
        Ok(self.checkpoints.get(workflow_id).map(|c| c.clone()))
    }

    fn ref_exists(&self, r: &UniversalReference) -> StorageResult<bool> {
        let exists = match r.object_type() {
            ObjectType::Document => self.documents.contains_key(r.id()),
            ObjectType::Chunk => self.chunks.contains_key(r.id()),
            ObjectType::SurfaceForm => self.surface_forms.contains_key(r.id()),
            ObjectType::Mention => self.mentions.contains_key(r.id()),
            ObjectType::Operation => self.operations.contains_key(r.id()),
            ObjectType::Checkpoint => self.checkpoint_ids.contains_key(r.id()),
            ObjectType::Entity | ObjectType::Vector => false,
        };
        Ok(exists)
    }
}

/// In-memory vector index with brute-force cosine search.
///
/// A vector is keyed by the id of the reference it embeds.
#[derive(Default)]
pub struct MemoryVectorIndex {
    vectors: DashMap<String, (UniversalReference, Vec<f32>)>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for MemoryVectorIndex {
    fn add_vectors(
        &self,
        vectors: &[Vec<f32>],
        refs: &[UniversalReference],
    ) -> StorageResult<()> {
        if vectors.len() != refs.len() {
            return Err(StorageError::InvalidInput(format!(
                "{} vectors for {} refs",
                vectors.len(),
                refs.len()
            )));
        }
        for (v, r) in vectors.iter().zip(refs) {
            self.vectors
                .insert(r.id().to_string(), (r.clone(), v.clone()));
        }
        Ok(())
    }

    fn search_similar(
        &self,
        vector: &[f32],
        k: usize,
    ) -> StorageResult<Vec<(UniversalReference, f32)>> {
        let mut scored: Vec<(UniversalReference, f32)> = self
            .vectors
            .iter()
            .map(|e| (e.value().0.clone(), cosine_similarity(vector, &e.value().1)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    fn vector_exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.vectors.contains_key(id))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
