//! Quality service — confidence assessment and propagation
//!
//! Confidence flows pessimistically: a derived object is only as strong as
//! the weakest input that produced it, and certain operations degrade it
//! further. Every penalty applied during propagation is returned as a
//! human-readable warning so operators can audit the degradation. Quality
//! degradation is the only soft-failure mechanism in the crate; it never
//! masks a hard error.

use crate::error::{WeftError, WeftResult};
use crate::model::{clamp_confidence, QualityTier};
use crate::reference::{ObjectType, ReferenceResolver, UniversalReference};
use crate::storage::{GraphStore, RelationalStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Degradation knobs for quality propagation
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Multiplier applied to `merge_operation` propagation
    pub merge_degradation: f32,
    /// Multiplier applied when parameters flag `partial_results`
    pub partial_results_degradation: f32,
    /// Operations producing fewer outputs than this are penalized
    pub min_expected_outputs: u64,
    /// Multiplier applied on the low-output penalty
    pub low_output_penalty: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            merge_degradation: 0.9,
            partial_results_degradation: 0.9,
            min_expected_outputs: 1,
            low_output_penalty: 0.8,
        }
    }
}

/// How a quality assessment was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssessmentMethod {
    /// Read the object's stored confidence
    Automatic,
    /// Operator-supplied override, clamped into [0, 1]
    Manual(f32),
}

impl AssessmentMethod {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual(_) => "manual",
        }
    }
}

/// A point-in-time quality reading for a referenced object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub reference: UniversalReference,
    pub confidence: f32,
    pub quality_tier: QualityTier,
    pub method: String,
    pub assessed_at: DateTime<Utc>,
}

/// Computes and propagates confidence for referenced objects.
pub struct QualityService {
    graph: Arc<dyn GraphStore>,
    relational: Arc<dyn RelationalStore>,
    resolver: ReferenceResolver,
    config: QualityConfig,
}

impl QualityService {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        relational: Arc<dyn RelationalStore>,
        resolver: ReferenceResolver,
    ) -> Self {
        Self {
            graph,
            relational,
            resolver,
            config: QualityConfig::default(),
        }
    }

    /// Override the degradation configuration.
    pub fn with_config(mut self, config: QualityConfig) -> Self {
        self.config = config;
        self
    }

    /// The stored confidence of a referenced object.
    ///
    /// Objects without an intrinsic score (surface forms, chunks, documents,
    /// vectors, checkpoints) count as ground truth: 1.0. Fails with a
    /// not-found error if the reference does not resolve.
    pub fn stored_confidence(&self, r: &UniversalReference) -> WeftResult<f32> {
        match r.object_type() {
            ObjectType::Entity => {
                let entity = self
                    .graph
                    .get_node(r.id())?
                    .ok_or_else(|| WeftError::NotFound(r.to_string()))?;
                Ok(clamp_confidence(entity.confidence))
            }
            ObjectType::Mention => {
                let mention = self
                    .relational
                    .get_mention(r.id())?
                    .ok_or_else(|| WeftError::NotFound(r.to_string()))?;
                Ok(clamp_confidence(mention.confidence))
            }
            ObjectType::Operation => {
                let op = self
                    .relational
                    .get_operation(r.id())?
                    .ok_or_else(|| WeftError::NotFound(r.to_string()))?;
                Ok(op.confidence.map(clamp_confidence).unwrap_or(1.0))
            }
            _ => {
                if !self.resolver.exists(r)? {
                    return Err(WeftError::NotFound(r.to_string()));
                }
                Ok(1.0)
            }
        }
    }

    /// Assess the quality of a referenced object.
    ///
    /// Manual overrides are clamped, logged, and written back to objects
    /// that carry a stored confidence.
    pub fn assess_quality(
        &self,
        r: &UniversalReference,
        method: AssessmentMethod,
    ) -> WeftResult<QualityAssessment> {
        let confidence = match method {
            AssessmentMethod::Automatic => self.stored_confidence(r)?,
            AssessmentMethod::Manual(override_value) => {
                let clamped = clamp_confidence(override_value);
                info!(reference = %r, confidence = clamped, "manual quality override");
                self.write_confidence(r, clamped)?;
                clamped
            }
        };
        Ok(QualityAssessment {
            reference: r.clone(),
            confidence,
            quality_tier: QualityTier::from_confidence(confidence),
            method: method.as_str().to_string(),
            assessed_at: Utc::now(),
        })
    }

    /// Propagate confidence through one operation.
    ///
    /// Starts from the minimum input confidence (a chain is only as strong
    /// as its weakest link), applies per-operation degradation factors, and
    /// never reports higher than that minimum. Returns the warnings that
    /// triggered each penalty.
    pub fn propagate_quality(
        &self,
        input_refs: &[UniversalReference],
        operation_type: &str,
        parameters: &serde_json::Map<String, serde_json::Value>,
    ) -> WeftResult<(f32, Vec<String>)> {
        let mut base = 1.0_f32;
        for r in input_refs {
            base = base.min(self.stored_confidence(r)?);
        }

        let mut factor = 1.0_f32;
        let mut warnings = Vec::new();

        if operation_type == "merge_operation" {
            factor *= self.config.merge_degradation;
            warnings.push(format!(
                "merge operation degrades confidence by x{}",
                self.config.merge_degradation
            ));
        }

        let partial = parameters
            .get("partial_results")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if partial {
            factor *= self.config.partial_results_degradation;
            warnings.push(format!(
                "partial results degrade confidence by x{}",
                self.config.partial_results_degradation
            ));
        }

        if let Some(output_count) = parameters.get("output_count").and_then(|v| v.as_u64()) {
            if output_count < self.config.min_expected_outputs {
                factor *= self.config.low_output_penalty;
                warnings.push(format!(
                    "{} outputs below expected minimum {}, confidence penalized by x{}",
                    output_count, self.config.min_expected_outputs, self.config.low_output_penalty
                ));
            }
        }

        let propagated = clamp_confidence(base * factor).min(base);
        debug!(
            operation_type,
            base, propagated, "propagated confidence"
        );
        Ok((propagated, warnings))
    }

    /// Fold a propagated confidence into each output object.
    ///
    /// Stored confidence only ever moves down here: the new value is
    /// `min(stored, folded)`. Output types without a stored confidence are
    /// skipped.
    pub fn fold_into_outputs(
        &self,
        output_refs: &[UniversalReference],
        folded: f32,
    ) -> WeftResult<()> {
        for r in output_refs {
            self.write_confidence(r, self.stored_confidence(r)?.min(folded))?;
        }
        Ok(())
    }

    fn write_confidence(&self, r: &UniversalReference, confidence: f32) -> WeftResult<()> {
        match r.object_type() {
            ObjectType::Entity => {
                let mut entity = self
                    .graph
                    .get_node(r.id())?
                    .ok_or_else(|| WeftError::NotFound(r.to_string()))?;
                entity.set_confidence(confidence);
                self.graph.update_node(&entity)?;
            }
            ObjectType::Mention => {
                let mut mention = self
                    .relational
                    .get_mention(r.id())?
                    .ok_or_else(|| WeftError::NotFound(r.to_string()))?;
                mention.confidence = clamp_confidence(confidence);
                self.relational.update_mention(&mention)?;
            }
            _ => {
                debug!(reference = %r, "no stored confidence for this type; skipping write");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entity;
    use crate::storage::{MemoryGraphStore, MemoryRelationalStore, MemoryVectorIndex};
    use serde_json::json;

    fn service() -> (QualityService, Arc<MemoryGraphStore>) {
        let graph = Arc::new(MemoryGraphStore::new());
        let relational = Arc::new(MemoryRelationalStore::new());
        let vector = Arc::new(MemoryVectorIndex::new());
        let resolver = ReferenceResolver::new(graph.clone(), relational.clone(), vector);
        (
            QualityService::new(graph.clone(), relational, resolver),
            graph,
        )
    }

    fn seeded_entity(graph: &MemoryGraphStore, name: &str, confidence: f32) -> UniversalReference {
        let entity = Entity::new(
            name,
            "ORGANIZATION",
            confidence,
            UniversalReference::mention("m1"),
        );
        graph.create_node(&entity).unwrap().reference()
    }

    // === Scenario: Propagation never exceeds the minimum input confidence ===
    #[test]
    fn propagation_is_monotone() {
        let (svc, graph) = service();
        let a = seeded_entity(&graph, "A", 0.9);
        let b = seeded_entity(&graph, "B", 0.6);

        let (conf, warnings) = svc
            .propagate_quality(&[a, b], "entity_resolution", &serde_json::Map::new())
            .unwrap();
        assert_eq!(conf, 0.6);
        assert!(warnings.is_empty());
    }

    // === Scenario: Partial results apply a x0.9 penalty with a warning ===
    #[test]
    fn partial_results_penalty() {
        let (svc, graph) = service();
        let a = seeded_entity(&graph, "A", 0.9);

        let mut params = serde_json::Map::new();
        params.insert("partial_results".into(), json!(true));
        let (conf, warnings) = svc
            .propagate_quality(&[a], "entity_resolution", &params)
            .unwrap();
        assert!((conf - 0.81).abs() < 1e-6);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("partial results"));
    }

    // === Scenario: Merge operations degrade; penalties stack ===
    #[test]
    fn merge_and_low_output_penalties_stack() {
        let (svc, graph) = service();
        let a = seeded_entity(&graph, "A", 1.0);

        let mut params = serde_json::Map::new();
        params.insert("output_count".into(), json!(0));
        let (conf, warnings) = svc
            .propagate_quality(&[a], "merge_operation", &params)
            .unwrap();
        // 1.0 * 0.9 (merge) * 0.8 (no outputs)
        assert!((conf - 0.72).abs() < 1e-6);
        assert_eq!(warnings.len(), 2);
    }

    // === Scenario: Dangling inputs fail with NotFoundError, never a soft score ===
    #[test]
    fn dangling_input_is_hard_error() {
        let (svc, _) = service();
        let dangling = UniversalReference::entity("ent_missing");
        assert!(matches!(
            svc.propagate_quality(&[dangling], "x", &serde_json::Map::new()),
            Err(WeftError::NotFound(_))
        ));
    }

    // === Scenario: Manual assessment clamps and persists the override ===
    #[test]
    fn manual_assessment_clamps_and_persists() {
        let (svc, graph) = service();
        let r = seeded_entity(&graph, "A", 0.9);

        let assessment = svc
            .assess_quality(&r, AssessmentMethod::Manual(1.7))
            .unwrap();
        assert_eq!(assessment.confidence, 1.0);
        assert_eq!(assessment.method, "manual");

        let auto = svc.assess_quality(&r, AssessmentMethod::Automatic).unwrap();
        assert_eq!(auto.confidence, 1.0);
        assert_eq!(auto.quality_tier, QualityTier::High);
    }

    // === Scenario: Folding only moves stored confidence down ===
    #[test]
    fn fold_never_raises_confidence() {
        let (svc, graph) = service();
        let r = seeded_entity(&graph, "A", 0.6);

        svc.fold_into_outputs(std::slice::from_ref(&r), 0.9).unwrap();
        assert_eq!(svc.stored_confidence(&r).unwrap(), 0.6);

        svc.fold_into_outputs(std::slice::from_ref(&r), 0.4).unwrap();
        assert_eq!(svc.stored_confidence(&r).unwrap(), 0.4);
    }
}
