//! Name normalization for entity dedup keys
//!
//! Raw surface text is stored as ground truth; dedup compares normalized
//! keys computed at lookup time. Normalization is intentionally conservative:
//! case folding, whitespace collapsing, and trimming of trailing corporate
//! punctuation — nothing semantic.

/// Normalize an entity name for key comparison.
pub fn normalized_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let collapsed: String = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c == '.' || c == ',')
        .to_string()
}

/// The dedup key for an entity: normalized name plus exact type.
pub fn resolution_key(name: &str, entity_type: &str) -> String {
    format!("{}::{}", normalized_name(name), entity_type)
}
