//! Canonical entities — the graph-owned side of the identity pipeline

use crate::model::clamp_confidence;
use crate::reference::UniversalReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discrete quality bucket derived from a continuous confidence score.
///
/// Always a pure function of confidence, never stored or mutated
/// independently, so score and tier cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    /// Thresholds: ≥ 0.8 HIGH, ≥ 0.5 MEDIUM, else LOW.
    pub fn from_confidence(confidence: f32) -> Self {
        let c = clamp_confidence(confidence);
        if c >= 0.8 {
            Self::High
        } else if c >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of an entity.
///
/// `MergedInto` is terminal: the entity survives as an alias pointing at the
/// winner, and all future resolution lands on the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "target", rename_all = "snake_case")]
pub enum EntityStatus {
    Active,
    MergedInto(UniversalReference),
}

/// A canonical, deduplicated real-world object.
///
/// Created by resolving one or more mentions to a single graph node.
/// Invariant: every entity has at least one mention reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (`ent_` + UUID)
    pub id: String,
    /// Canonical display name
    pub canonical_name: String,
    /// Semantic type, matching the mention type that created it
    pub entity_type: String,
    /// Confidence in [0, 1], seeded from the creating mention
    pub confidence: f32,
    /// Mentions resolved to this entity
    pub mention_refs: Vec<UniversalReference>,
    /// Lifecycle state
    pub status: EntityStatus,
    /// When the entity was minted
    pub created_at: DateTime<Utc>,
    /// When the entity was last modified
    pub modified_at: Option<DateTime<Utc>>,
}

impl Entity {
    /// Mint a new entity from its first mention.
    pub fn new(
        canonical_name: impl Into<String>,
        entity_type: impl Into<String>,
        confidence: f32,
        first_mention: UniversalReference,
    ) -> Self {
        Self {
            id: format!("ent_{}", Uuid::new_v4()),
            canonical_name: canonical_name.into(),
            entity_type: entity_type.into(),
            confidence: clamp_confidence(confidence),
            mention_refs: vec![first_mention],
            status: EntityStatus::Active,
            created_at: Utc::now(),
            modified_at: None,
        }
    }

    /// The reference addressing this entity.
    pub fn reference(&self) -> UniversalReference {
        UniversalReference::entity(&self.id)
    }

    /// The quality tier derived from the current confidence.
    pub fn quality_tier(&self) -> QualityTier {
        QualityTier::from_confidence(self.confidence)
    }

    /// The normalized (name, type) key used for dedup lookups.
    pub fn resolution_key(&self) -> String {
        crate::identity::resolution_key(&self.canonical_name, &self.entity_type)
    }

    /// Whether the entity is still resolvable (not merged away).
    pub fn is_active(&self) -> bool {
        matches!(self.status, EntityStatus::Active)
    }

    /// Attach a mention if not already present. Returns true if added.
    pub fn attach_mention(&mut self, mention_ref: UniversalReference) -> bool {
        if self.mention_refs.contains(&mention_ref) {
            return false;
        }
        self.mention_refs.push(mention_ref);
        self.modified_at = Some(Utc::now());
        true
    }

    /// Update confidence, clamping into range. Tier follows automatically.
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = clamp_confidence(confidence);
        self.modified_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Scenario: Tier is a pure function of confidence ===
    #[test]
    fn tier_thresholds() {
        assert_eq!(QualityTier::from_confidence(0.95), QualityTier::High);
        assert_eq!(QualityTier::from_confidence(0.8), QualityTier::High);
        assert_eq!(QualityTier::from_confidence(0.79), QualityTier::Medium);
        assert_eq!(QualityTier::from_confidence(0.5), QualityTier::Medium);
        assert_eq!(QualityTier::from_confidence(0.49), QualityTier::Low);
        assert_eq!(QualityTier::from_confidence(-0.3), QualityTier::Low);
    }

    // === Scenario: Tier follows confidence updates without separate bookkeeping ===
    #[test]
    fn tier_follows_confidence() {
        let mut e = Entity::new(
            "Apple Inc.",
            "ORGANIZATION",
            0.9,
            UniversalReference::mention("m1"),
        );
        assert_eq!(e.quality_tier(), QualityTier::High);

        e.set_confidence(0.6);
        assert_eq!(e.quality_tier(), QualityTier::Medium);

        e.set_confidence(1.4);
        assert_eq!(e.confidence, 1.0);
        assert_eq!(e.quality_tier(), QualityTier::High);
    }

    // === Scenario: Attaching the same mention twice is a no-op ===
    #[test]
    fn attach_mention_dedups() {
        let mut e = Entity::new(
            "Apple Inc.",
            "ORGANIZATION",
            0.9,
            UniversalReference::mention("m1"),
        );
        assert!(!e.attach_mention(UniversalReference::mention("m1")));
        assert!(e.attach_mention(UniversalReference::mention("m2")));
        assert_eq!(e.mention_refs.len(), 2);
    }
}
