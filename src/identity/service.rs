//! Identity service implementation

use super::normalize::resolution_key;
use crate::error::{WeftError, WeftResult};
use crate::model::{Entity, EntityStatus, Mention, OperationStatus, SurfaceForm};
use crate::provenance::ProvenanceService;
use crate::reference::{ObjectType, UniversalReference};
use crate::storage::{GraphStore, RelationalStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns raw text spans into canonical entities.
///
/// Minting is atomic per dedup key: surface-form and mention ids are
/// content-derived, entity creation is unique per resolution key, and a
/// concurrent loser always resolves to the winner's reference.
pub struct IdentityService {
    graph: Arc<dyn GraphStore>,
    relational: Arc<dyn RelationalStore>,
}

impl IdentityService {
    pub fn new(graph: Arc<dyn GraphStore>, relational: Arc<dyn RelationalStore>) -> Self {
        Self { graph, relational }
    }

    /// Mint a surface form for a text span within a chunk.
    ///
    /// Idempotent: identical (text, offsets) within the same chunk return
    /// the existing reference rather than duplicating.
    pub fn create_surface_form(
        &self,
        text: &str,
        context: &str,
        chunk_ref: &UniversalReference,
        start_offset: usize,
        end_offset: usize,
    ) -> WeftResult<UniversalReference> {
        if text.is_empty() {
            return Err(WeftError::Validation("surface form text is empty".into()));
        }
        if end_offset < start_offset {
            return Err(WeftError::Validation(format!(
                "inconsistent offsets: end {} < start {}",
                end_offset, start_offset
            )));
        }
        if chunk_ref.object_type() != ObjectType::Chunk {
            return Err(WeftError::Validation(format!(
                "source ref must be a chunk, got {}",
                chunk_ref
            )));
        }
        if !self.relational.ref_exists(chunk_ref)? {
            return Err(WeftError::NotFound(chunk_ref.to_string()));
        }

        let form = SurfaceForm::new(text, context, chunk_ref.clone(), start_offset, end_offset);
        let stored = self.relational.mint_surface_form(&form)?;
        debug!(id = %stored.id, chunk = %chunk_ref, "minted surface form");
        Ok(stored.reference())
    }

    /// Attach a semantic type to a surface form, minting a mention.
    pub fn create_mention(
        &self,
        surface_form_ref: &UniversalReference,
        mention_type: &str,
        attributes: serde_json::Map<String, serde_json::Value>,
        confidence: f32,
    ) -> WeftResult<UniversalReference> {
        if mention_type.is_empty() {
            return Err(WeftError::Validation("mention type is empty".into()));
        }
        if surface_form_ref.object_type() != ObjectType::SurfaceForm {
            return Err(WeftError::Validation(format!(
                "expected a surface form ref, got {}",
                surface_form_ref
            )));
        }
        if !self.relational.ref_exists(surface_form_ref)? {
            return Err(WeftError::NotFound(surface_form_ref.to_string()));
        }

        let mention = Mention::new(surface_form_ref.clone(), mention_type, attributes, confidence);
        let stored = self.relational.mint_mention(&mention)?;
        debug!(id = %stored.id, mention_type, "minted mention");
        Ok(stored.reference())
    }

    /// Resolve a mention to a canonical entity.
    ///
    /// Searches the explicit candidates first; when none are supplied, falls
    /// back to an index lookup by the mention's normalized (name, type) key.
    /// The highest-confidence exact-type match wins; on equal confidence the
    /// entity with the most existing mention references wins (more evidence).
    /// With no match, a new entity is minted when `create_if_missing` is set,
    /// seeded with the mention's extraction confidence.
    pub fn resolve_entity(
        &self,
        mention_ref: &UniversalReference,
        candidate_refs: &[UniversalReference],
        create_if_missing: bool,
    ) -> WeftResult<UniversalReference> {
        let mention = self.get_mention(mention_ref)?;
        let form = self.get_surface_form(&mention.surface_form_ref)?;
        let key = resolution_key(&form.text, &mention.mention_type);

        let candidates = if candidate_refs.is_empty() {
            self.graph.find_by_key(&key)?
        } else {
            let mut loaded = Vec::with_capacity(candidate_refs.len());
            for r in candidate_refs {
                loaded.push(self.get_entity(r)?);
            }
            loaded
        };

        let best = candidates
            .into_iter()
            .filter(|e| e.is_active() && e.entity_type == mention.mention_type)
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.mention_refs.len().cmp(&b.mention_refs.len()))
            });

        if let Some(mut entity) = best {
            if entity.attach_mention(mention_ref.clone()) {
                self.graph.update_node(&entity)?;
            }
            debug!(entity = %entity.id, %key, "resolved mention to existing entity");
            return Ok(entity.reference());
        }

        if !create_if_missing {
            return Err(WeftError::NoMatch { key });
        }

        let fresh = Entity::new(
            &form.text,
            &mention.mention_type,
            mention.confidence,
            mention_ref.clone(),
        );
        let mut stored = self.graph.create_node(&fresh)?;
        if stored.id != fresh.id {
            // Lost the minting race; resolve to the winner and attach there.
            if stored.attach_mention(mention_ref.clone()) {
                self.graph.update_node(&stored)?;
            }
        }
        info!(entity = %stored.id, %key, "minted entity");
        Ok(stored.reference())
    }

    /// One-directional entity merge.
    ///
    /// The target absorbs the source's mentions; the source becomes a
    /// terminal alias. The merge is recorded as a `merge_operation`
    /// provenance record, and the target's confidence degrades through the
    /// quality fold on completion.
    pub fn merge_entities(
        &self,
        source_ref: &UniversalReference,
        target_ref: &UniversalReference,
        tool_id: &str,
        provenance: &ProvenanceService,
    ) -> WeftResult<UniversalReference> {
        if source_ref == target_ref {
            return Err(WeftError::Validation(
                "cannot merge an entity into itself".into(),
            ));
        }
        let source = self.get_entity(source_ref)?;
        let mut target = self.get_entity(target_ref)?;
        for (entity, r) in [(&source, source_ref), (&target, target_ref)] {
            if !entity.is_active() {
                return Err(WeftError::InvalidState {
                    subject: r.to_string(),
                    expected: "active".into(),
                    actual: "merged".into(),
                });
            }
        }

        let operation_id = provenance.start_operation(
            "merge_operation",
            tool_id,
            vec![source_ref.clone(), target_ref.clone()],
            serde_json::Map::new(),
        )?;

        for mention in source.mention_refs.iter() {
            target.attach_mention(mention.clone());
        }
        self.graph.update_node(&target)?;

        let mut retired = source;
        retired.status = EntityStatus::MergedInto(target_ref.clone());
        self.graph.update_node(&retired)?;
        self.graph
            .merge_edge(&retired.id, &target.id, "merged_into")?;

        let merge_confidence = retired.confidence.min(target.confidence);
        provenance.complete_operation(
            &operation_id,
            vec![target_ref.clone()],
            OperationStatus::Completed,
            merge_confidence,
            None,
        )?;

        info!(source = %retired.id, target = %target.id, "merged entities");
        Ok(UniversalReference::operation(operation_id))
    }

    /// Load an entity by reference.
    pub fn get_entity(&self, r: &UniversalReference) -> WeftResult<Entity> {
        if r.object_type() != ObjectType::Entity {
            return Err(WeftError::Validation(format!(
                "expected an entity ref, got {}",
                r
            )));
        }
        self.graph
            .get_node(r.id())?
            .ok_or_else(|| WeftError::NotFound(r.to_string()))
    }

    /// Load a mention by reference.
    pub fn get_mention(&self, r: &UniversalReference) -> WeftResult<Mention> {
        if r.object_type() != ObjectType::Mention {
            return Err(WeftError::Validation(format!(
                "expected a mention ref, got {}",
                r
            )));
        }
        self.relational
            .get_mention(r.id())?
            .ok_or_else(|| WeftError::NotFound(r.to_string()))
    }

    /// Load a surface form by reference.
    pub fn get_surface_form(&self, r: &UniversalReference) -> WeftResult<SurfaceForm> {
        if r.object_type() != ObjectType::SurfaceForm {
            return Err(WeftError::Validation(format!(
                "expected a surface form ref, got {}",
                r
            )));
        }
        self.relational
            .get_surface_form(r.id())?
            .ok_or_else(|| WeftError::NotFound(r.to_string()))
    }

    /// Active entities under a normalized (name, type) key.
    pub fn find_entities_by_key(&self, name: &str, entity_type: &str) -> WeftResult<Vec<Entity>> {
        Ok(self.graph.find_by_key(&resolution_key(name, entity_type))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryGraphStore, MemoryRelationalStore};

    fn service() -> (IdentityService, Arc<MemoryRelationalStore>) {
        let graph = Arc::new(MemoryGraphStore::new());
        let relational = Arc::new(MemoryRelationalStore::new());
        relational.register_chunk("c1", None).unwrap();
        (
            IdentityService::new(graph, relational.clone()),
            relational,
        )
    }

    fn chunk() -> UniversalReference {
        UniversalReference::chunk("c1")
    }

    // === Scenario: Re-submitting identical text/offsets returns the same reference ===
    #[test]
    fn surface_form_minting_is_idempotent() {
        let (svc, _) = service();
        let a = svc
            .create_surface_form("Apple Inc.", "ctx", &chunk(), 0, 10)
            .unwrap();
        let b = svc
            .create_surface_form("Apple Inc.", "ctx", &chunk(), 0, 10)
            .unwrap();
        assert_eq!(a, b);
    }

    // === Scenario: Bad inputs are rejected with ValidationError ===
    #[test]
    fn surface_form_validation() {
        let (svc, _) = service();
        assert!(matches!(
            svc.create_surface_form("", "ctx", &chunk(), 0, 10),
            Err(WeftError::Validation(_))
        ));
        assert!(matches!(
            svc.create_surface_form("x", "ctx", &chunk(), 10, 2),
            Err(WeftError::Validation(_))
        ));
        assert!(matches!(
            svc.create_surface_form("x", "ctx", &chunk(), 0, 1),
            Ok(_)
        ));
    }

    // === Scenario: Mentions on dangling surface forms fail with NotFoundError ===
    #[test]
    fn mention_requires_resolvable_surface_form() {
        let (svc, _) = service();
        let dangling = UniversalReference::surface_form("sf_missing");
        assert!(matches!(
            svc.create_mention(&dangling, "ORGANIZATION", Default::default(), 0.9),
            Err(WeftError::NotFound(_))
        ));
    }

    // === Scenario: resolve_entity mints with the mention's confidence ===
    #[test]
    fn resolve_creates_entity_seeded_from_mention() {
        let (svc, _) = service();
        let sf = svc
            .create_surface_form("Apple Inc.", "ctx", &chunk(), 0, 10)
            .unwrap();
        let mention = svc
            .create_mention(&sf, "ORGANIZATION", Default::default(), 0.9)
            .unwrap();

        let entity_ref = svc.resolve_entity(&mention, &[], true).unwrap();
        let entity = svc.get_entity(&entity_ref).unwrap();
        assert_eq!(entity.canonical_name, "Apple Inc.");
        assert_eq!(entity.confidence, 0.9);
        assert_eq!(entity.quality_tier(), crate::model::QualityTier::High);
        assert_eq!(entity.mention_refs, vec![mention]);
    }

    // === Scenario: No match and create_if_missing=false raises NoMatchError ===
    #[test]
    fn resolve_without_create_raises_no_match() {
        let (svc, _) = service();
        let sf = svc
            .create_surface_form("Acme Corp", "ctx", &chunk(), 0, 9)
            .unwrap();
        let mention = svc
            .create_mention(&sf, "ORGANIZATION", Default::default(), 0.8)
            .unwrap();

        assert!(matches!(
            svc.resolve_entity(&mention, &[], false),
            Err(WeftError::NoMatch { .. })
        ));
    }

    // === Scenario: A second mention of the same name resolves to the existing entity ===
    #[test]
    fn resolve_dedups_by_normalized_key() {
        let (svc, _) = service();
        let sf1 = svc
            .create_surface_form("Apple Inc.", "ctx a", &chunk(), 0, 10)
            .unwrap();
        let m1 = svc
            .create_mention(&sf1, "ORGANIZATION", Default::default(), 0.9)
            .unwrap();
        let first = svc.resolve_entity(&m1, &[], true).unwrap();

        // Different offsets, different casing, same normalized key
        let sf2 = svc
            .create_surface_form("APPLE  INC", "ctx b", &chunk(), 40, 49)
            .unwrap();
        let m2 = svc
            .create_mention(&sf2, "ORGANIZATION", Default::default(), 0.7)
            .unwrap();
        let second = svc.resolve_entity(&m2, &[], true).unwrap();

        assert_eq!(first, second);
        let entity = svc.get_entity(&first).unwrap();
        assert_eq!(entity.mention_refs.len(), 2);
    }

    // === Scenario: Type must match exactly; same name, different type stays distinct ===
    #[test]
    fn resolve_requires_exact_type_match() {
        let (svc, _) = service();
        let sf = svc
            .create_surface_form("Jordan", "ctx", &chunk(), 0, 6)
            .unwrap();
        let person = svc
            .create_mention(&sf, "PERSON", Default::default(), 0.9)
            .unwrap();
        let geo = svc.create_mention(&sf, "GEO", Default::default(), 0.9).unwrap();

        let person_entity = svc.resolve_entity(&person, &[], true).unwrap();
        let geo_entity = svc.resolve_entity(&geo, &[], true).unwrap();
        assert_ne!(person_entity, geo_entity);
    }

    // === Scenario: Ties on confidence prefer the entity with more mentions ===
    #[test]
    fn tie_break_prefers_more_evidence() {
        let (svc, _) = service();

        // Candidate with one mention
        let sf_a = svc
            .create_surface_form("Mercury Ltd", "ctx", &chunk(), 0, 11)
            .unwrap();
        let m_a = svc
            .create_mention(&sf_a, "ORGANIZATION", Default::default(), 0.8)
            .unwrap();
        let thin = svc.resolve_entity(&m_a, &[], true).unwrap();

        // Candidate with two mentions, same confidence
        let sf_b = svc
            .create_surface_form("Mercury Corp", "ctx", &chunk(), 20, 32)
            .unwrap();
        let m_b = svc
            .create_mention(&sf_b, "ORGANIZATION", Default::default(), 0.8)
            .unwrap();
        let fat = svc.resolve_entity(&m_b, &[], true).unwrap();
        let sf_b2 = svc
            .create_surface_form("mercury corp", "ctx2", &chunk(), 40, 52)
            .unwrap();
        let m_b2 = svc
            .create_mention(&sf_b2, "ORGANIZATION", Default::default(), 0.8)
            .unwrap();
        assert_eq!(svc.resolve_entity(&m_b2, &[], true).unwrap(), fat);

        // A new mention offered both explicit candidates lands on the one
        // with more evidence.
        let sf_new = svc
            .create_surface_form("Mercury Industries", "ctx", &chunk(), 60, 78)
            .unwrap();
        let m_new = svc
            .create_mention(&sf_new, "ORGANIZATION", Default::default(), 0.9)
            .unwrap();
        let resolved = svc
            .resolve_entity(&m_new, &[thin, fat.clone()], false)
            .unwrap();
        assert_eq!(resolved, fat);
    }
}
