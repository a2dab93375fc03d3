//! Store traits and reference implementations
//!
//! The physical engines behind the three stores are external collaborators;
//! this module pins down their contracts and ships two reference backends:
//! DashMap-based in-memory stores and a SQLite relational store.

mod memory;
mod sqlite;
mod traits;

pub use memory::{MemoryGraphStore, MemoryRelationalStore, MemoryVectorIndex};
pub use sqlite::SqliteRelationalStore;
pub use traits::{GraphStore, RelationalStore, StorageError, StorageResult, VectorIndex};
