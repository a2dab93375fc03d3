//! Surface forms and mentions — the textual side of the identity pipeline

use crate::model::clamp_confidence;
use crate::reference::UniversalReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A distinct occurrence of a text span within a chunk.
///
/// Created once per distinct (text, context-window) occurrence and immutable
/// after creation. The id is derived from a content hash of the chunk, text,
/// and offsets, so re-submitting identical content yields the same id. This
/// is what makes minting idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceForm {
    /// Unique identifier (`sf_` + content-hash UUID)
    pub id: String,
    /// The raw text of the span
    pub text: String,
    /// Surrounding context window
    pub context: String,
    /// The chunk this span was found in
    pub source_chunk_ref: UniversalReference,
    /// Span start offset within the chunk
    pub start_offset: usize,
    /// Span end offset within the chunk (exclusive)
    pub end_offset: usize,
    /// When the surface form was first minted
    pub created_at: DateTime<Utc>,
}

impl SurfaceForm {
    /// Create a surface form with a deterministic, content-derived id.
    pub fn new(
        text: impl Into<String>,
        context: impl Into<String>,
        source_chunk_ref: UniversalReference,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        let text = text.into();
        let context = context.into();
        let id = format!(
            "sf_{}",
            content_hash(&[
                source_chunk_ref.id(),
                &text,
                &start_offset.to_string(),
                &end_offset.to_string(),
            ])
        );
        Self {
            id,
            text,
            context,
            source_chunk_ref,
            start_offset,
            end_offset,
            created_at: Utc::now(),
        }
    }

    /// The reference addressing this surface form.
    pub fn reference(&self) -> UniversalReference {
        UniversalReference::surface_form(&self.id)
    }
}

/// A typed occurrence of a surface form.
///
/// Many mentions may point to the same surface form text but differ by
/// semantic type. The id is derived from (surface form, mention type), so
/// concurrent minting with the same key converges on one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Unique identifier (`men_` + key-hash UUID)
    pub id: String,
    /// The surface form this mention types
    pub surface_form_ref: UniversalReference,
    /// Semantic type (e.g. "ORGANIZATION", "PERSON")
    pub mention_type: String,
    /// Extractor-supplied attributes
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Extraction confidence, clamped to [0, 1]
    pub confidence: f32,
    /// When the mention was minted
    pub created_at: DateTime<Utc>,
}

impl Mention {
    /// Create a mention with a deterministic (surface form, type) id.
    pub fn new(
        surface_form_ref: UniversalReference,
        mention_type: impl Into<String>,
        attributes: serde_json::Map<String, serde_json::Value>,
        confidence: f32,
    ) -> Self {
        let mention_type = mention_type.into();
        let id = format!(
            "men_{}",
            content_hash(&[surface_form_ref.id(), &mention_type])
        );
        Self {
            id,
            surface_form_ref,
            mention_type,
            attributes,
            confidence: clamp_confidence(confidence),
            created_at: Utc::now(),
        }
    }

    /// The reference addressing this mention.
    pub fn reference(&self) -> UniversalReference {
        UniversalReference::mention(&self.id)
    }
}

/// UUIDv5 over the `|`-joined parts, namespaced to this crate.
fn content_hash(parts: &[&str]) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, parts.join("|").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Scenario: Identical content yields identical surface form ids ===
    #[test]
    fn surface_form_id_is_content_derived() {
        let chunk = UniversalReference::chunk("c1");
        let a = SurfaceForm::new("Apple Inc.", "ctx", chunk.clone(), 0, 10);
        let b = SurfaceForm::new("Apple Inc.", "ctx", chunk.clone(), 0, 10);
        assert_eq!(a.id, b.id);

        // Different offsets produce a different surface form
        let c = SurfaceForm::new("Apple Inc.", "ctx", chunk, 5, 15);
        assert_ne!(a.id, c.id);
    }

    // === Scenario: Mention ids are keyed on (surface form, type) ===
    #[test]
    fn mention_id_keyed_on_surface_form_and_type() {
        let sf = UniversalReference::surface_form("sf_x");
        let a = Mention::new(sf.clone(), "ORGANIZATION", Default::default(), 0.9);
        let b = Mention::new(sf.clone(), "ORGANIZATION", Default::default(), 0.7);
        assert_eq!(a.id, b.id);

        let c = Mention::new(sf, "PERSON", Default::default(), 0.9);
        assert_ne!(a.id, c.id);
    }

    // === Scenario: Mention confidence is clamped, not rejected ===
    #[test]
    fn mention_confidence_clamped() {
        let sf = UniversalReference::surface_form("sf_x");
        let m = Mention::new(sf, "PERSON", Default::default(), 1.7);
        assert_eq!(m.confidence, 1.0);
    }
}
