//! Identity service — surface forms, mentions, and canonical entities
//!
//! Raw text spans become canonical entities through a three-stage pipeline:
//! SurfaceForm (where the text occurred) → Mention (what kind of thing it
//! names) → Entity (the deduplicated real-world object). Dedup rides on
//! normalized (name, type) keys.

mod normalize;
mod service;

pub use normalize::{normalized_name, resolution_key};
pub use service::IdentityService;
