//! Typed cross-store references
//!
//! Every object in the system lives in exactly one of three stores and is
//! addressed by a `UniversalReference` with the wire form
//! `"<store>://<object_type>/<id>"`. Parsing validates against closed
//! enumerations at the boundary; unknown stores, unknown object types, and
//! store/object-type pairs that disagree with ownership are rejected.

mod resolver;
mod types;

pub use resolver::ReferenceResolver;
pub use types::{ObjectType, ParseError, Store, UniversalReference};
