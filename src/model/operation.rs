//! Provenance records and tool statistics

use crate::reference::UniversalReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a provenance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Running,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for OperationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown operation status: {}", s)),
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded operation: a tool invocation with its inputs and outputs.
///
/// Created when a tool begins work, mutated exactly once on completion or
/// failure, immutable thereafter. An operation's inputs must already exist
/// as some operation's outputs or be externally supplied roots; together
/// the records form the lineage DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Unique identifier (`op_` + UUID)
    pub id: String,
    /// What kind of work this was (e.g. "entity_resolution", "merge_operation")
    pub operation_type: String,
    /// The tool that performed the work
    pub tool_id: String,
    /// References consumed
    pub input_refs: Vec<UniversalReference>,
    /// References produced (empty while running)
    pub output_refs: Vec<UniversalReference>,
    /// Tool parameters as supplied at start
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Current status
    pub status: OperationStatus,
    /// Per-operation confidence reported at completion
    pub confidence: Option<f32>,
    /// Wall-clock duration, set at completion
    pub duration_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure detail, set when status is `failed`
    pub error_message: Option<String>,
}

impl ProvenanceRecord {
    /// Open a new running record.
    pub fn start(
        operation_type: impl Into<String>,
        tool_id: impl Into<String>,
        input_refs: Vec<UniversalReference>,
        parameters: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: format!("op_{}", Uuid::new_v4()),
            operation_type: operation_type.into(),
            tool_id: tool_id.into(),
            input_refs,
            output_refs: Vec::new(),
            parameters,
            status: OperationStatus::Running,
            confidence: None,
            duration_ms: None,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    /// The reference addressing this record.
    pub fn reference(&self) -> UniversalReference {
        UniversalReference::operation(&self.id)
    }
}

/// Aggregated per-tool call statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolStatistics {
    pub tool_id: String,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_duration_ms: i64,
    pub last_used: Option<DateTime<Utc>>,
}

impl ToolStatistics {
    /// Zeroed statistics for a tool with no recorded calls.
    pub fn empty(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            total_duration_ms: 0,
            last_used: None,
        }
    }

    /// Mean duration across all recorded calls.
    pub fn avg_duration_ms(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.total_calls as f64
        }
    }
}
