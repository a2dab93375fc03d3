//! Provenance service — the auditable operation DAG
//!
//! Every tool invocation is recorded as an operation with its input and
//! output references. Because an operation's inputs are some earlier
//! operation's outputs (or externally supplied roots), the records form a
//! DAG that can be walked in either direction to answer "where did this
//! come from" and "what was derived from this".

mod service;

pub use service::{LineageDirection, ProvenanceService};
