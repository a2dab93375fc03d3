//! Reference value types: stores, object types, and the wire format

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing a reference string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed reference '{0}': expected '<store>://<object_type>/<id>'")]
    Malformed(String),

    #[error("unknown store scheme '{0}'")]
    UnknownStore(String),

    #[error("unknown object type '{0}'")]
    UnknownObjectType(String),

    #[error("object type '{object_type}' is not owned by store '{store}'")]
    StoreMismatch { store: String, object_type: String },

    #[error("reference '{0}' has an empty id")]
    EmptyId(String),
}

/// The three physical stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    /// Graph store: owns entities (nodes and edges)
    Graph,
    /// Relational store: owns documents, chunks, surface forms, mentions,
    /// operation records, and checkpoints
    Relational,
    /// Vector index: owns embeddings
    Vector,
}

impl Store {
    /// The URI scheme used in the wire format
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Graph => "graphstore",
            Self::Relational => "relstore",
            Self::Vector => "vectorstore",
        }
    }

    fn from_scheme(s: &str) -> Option<Self> {
        match s {
            "graphstore" => Some(Self::Graph),
            "relstore" => Some(Self::Relational),
            "vectorstore" => Some(Self::Vector),
            _ => None,
        }
    }
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scheme())
    }
}

/// Object types addressable by references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Entity,
    Mention,
    SurfaceForm,
    Vector,
    Document,
    Chunk,
    Operation,
    Checkpoint,
}

impl ObjectType {
    /// The wire-format name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Mention => "mention",
            Self::SurfaceForm => "surface_form",
            Self::Vector => "vector",
            Self::Document => "document",
            Self::Chunk => "chunk",
            Self::Operation => "operation",
            Self::Checkpoint => "checkpoint",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "entity" => Some(Self::Entity),
            "mention" => Some(Self::Mention),
            "surface_form" => Some(Self::SurfaceForm),
            "vector" => Some(Self::Vector),
            "document" => Some(Self::Document),
            "chunk" => Some(Self::Chunk),
            "operation" => Some(Self::Operation),
            "checkpoint" => Some(Self::Checkpoint),
            _ => None,
        }
    }

    /// The store that exclusively owns objects of this type.
    ///
    /// Ownership is fixed: entities live in the graph store, embeddings in
    /// the vector index, everything else in the relational store. Cross-store
    /// consistency is reference-based only; no store holds a foreign row.
    pub fn owning_store(&self) -> Store {
        match self {
            Self::Entity => Store::Graph,
            Self::Vector => Store::Vector,
            Self::Mention
            | Self::SurfaceForm
            | Self::Document
            | Self::Chunk
            | Self::Operation
            | Self::Checkpoint => Store::Relational,
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable typed pointer to an object in exactly one store.
///
/// Serialized as its wire string, e.g. `graphstore://entity/ent_123`.
/// The `(store, object_type)` pair is validated at construction; `id` is
/// opaque and unique within the pair. References are never reused after
/// deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UniversalReference {
    store: Store,
    object_type: ObjectType,
    id: String,
}

impl UniversalReference {
    /// Create a reference for the given object type; the store is derived
    /// from the type's fixed ownership.
    pub fn new(object_type: ObjectType, id: impl Into<String>) -> Self {
        Self {
            store: object_type.owning_store(),
            object_type,
            id: id.into(),
        }
    }

    /// Parse a wire-format reference string.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| ParseError::Malformed(s.to_string()))?;
        let (type_name, id) = rest
            .split_once('/')
            .ok_or_else(|| ParseError::Malformed(s.to_string()))?;

        let store = Store::from_scheme(scheme)
            .ok_or_else(|| ParseError::UnknownStore(scheme.to_string()))?;
        let object_type = ObjectType::from_name(type_name)
            .ok_or_else(|| ParseError::UnknownObjectType(type_name.to_string()))?;

        if object_type.owning_store() != store {
            return Err(ParseError::StoreMismatch {
                store: scheme.to_string(),
                object_type: type_name.to_string(),
            });
        }
        if id.is_empty() {
            return Err(ParseError::EmptyId(s.to_string()));
        }

        Ok(Self {
            store,
            object_type,
            id: id.to_string(),
        })
    }

    pub fn store(&self) -> Store {
        self.store
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // Convenience constructors for the common object types

    pub fn entity(id: impl Into<String>) -> Self {
        Self::new(ObjectType::Entity, id)
    }

    pub fn mention(id: impl Into<String>) -> Self {
        Self::new(ObjectType::Mention, id)
    }

    pub fn surface_form(id: impl Into<String>) -> Self {
        Self::new(ObjectType::SurfaceForm, id)
    }

    pub fn document(id: impl Into<String>) -> Self {
        Self::new(ObjectType::Document, id)
    }

    pub fn chunk(id: impl Into<String>) -> Self {
        Self::new(ObjectType::Chunk, id)
    }

    pub fn vector(id: impl Into<String>) -> Self {
        Self::new(ObjectType::Vector, id)
    }

    pub fn operation(id: impl Into<String>) -> Self {
        Self::new(ObjectType::Operation, id)
    }

    pub fn checkpoint(id: impl Into<String>) -> Self {
        Self::new(ObjectType::Checkpoint, id)
    }
}

impl std::fmt::Display for UniversalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}/{}", self.store, self.object_type, self.id)
    }
}

impl std::str::FromStr for UniversalReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UniversalReference {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<UniversalReference> for String {
    fn from(r: UniversalReference) -> Self {
        r.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Scenario: Round-trip through the wire format ===
    #[test]
    fn parse_and_format_round_trip() {
        let r = UniversalReference::parse("graphstore://entity/ent_123").unwrap();
        assert_eq!(r.store(), Store::Graph);
        assert_eq!(r.object_type(), ObjectType::Entity);
        assert_eq!(r.id(), "ent_123");
        assert_eq!(r.to_string(), "graphstore://entity/ent_123");
    }

    // === Scenario: Construction derives the owning store ===
    #[test]
    fn new_derives_owning_store() {
        assert_eq!(UniversalReference::entity("e").store(), Store::Graph);
        assert_eq!(UniversalReference::mention("m").store(), Store::Relational);
        assert_eq!(
            UniversalReference::surface_form("s").store(),
            Store::Relational
        );
        assert_eq!(UniversalReference::vector("v").store(), Store::Vector);
    }

    // === Scenario: Malformed strings are rejected ===
    #[test]
    fn rejects_malformed() {
        assert!(matches!(
            UniversalReference::parse("no-scheme-here"),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(
            UniversalReference::parse("graphstore://entitynoid"),
            Err(ParseError::Malformed(_))
        ));
    }

    // === Scenario: Unknown store and object type are rejected at the boundary ===
    #[test]
    fn rejects_unknown_enumerants() {
        assert!(matches!(
            UniversalReference::parse("kvstore://entity/e1"),
            Err(ParseError::UnknownStore(_))
        ));
        assert!(matches!(
            UniversalReference::parse("graphstore://widget/w1"),
            Err(ParseError::UnknownObjectType(_))
        ));
    }

    // === Scenario: Store/object-type pairs that disagree with ownership are rejected ===
    #[test]
    fn rejects_store_mismatch() {
        assert!(matches!(
            UniversalReference::parse("relstore://entity/e1"),
            Err(ParseError::StoreMismatch { .. })
        ));
        assert!(matches!(
            UniversalReference::parse("graphstore://mention/m1"),
            Err(ParseError::StoreMismatch { .. })
        ));
    }

    // === Scenario: Empty ids are rejected ===
    #[test]
    fn rejects_empty_id() {
        assert!(matches!(
            UniversalReference::parse("graphstore://entity/"),
            Err(ParseError::EmptyId(_))
        ));
    }

    // === Scenario: Serde round-trips through the string form ===
    #[test]
    fn serde_string_form() {
        let r = UniversalReference::chunk("c1");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"relstore://chunk/c1\"");
        let back: UniversalReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
