//! Workflow checkpoints — resumable snapshots of pipeline progress

use crate::reference::UniversalReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// COMPLETED and FAILED are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("unknown workflow status: {}", s)),
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted, resumable snapshot of a workflow's progress.
///
/// Created at workflow start, updated at each step boundary, finalized at
/// completion. Invariant: `step_number <= total_steps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCheckpoint {
    /// Unique identifier (`cp_` + UUID)
    pub id: String,
    /// The workflow this checkpoint snapshots (`wf_` + UUID)
    pub workflow_id: String,
    /// Kind of workflow (e.g. "document_ingestion")
    pub workflow_type: String,
    pub status: WorkflowStatus,
    /// Last recorded step (0 before any progress)
    pub step_number: u32,
    pub total_steps: u32,
    /// Accumulated state; later updates overwrite earlier keys
    pub state_data: serde_json::Map<String, serde_json::Value>,
    /// Operations completed by this workflow, in completion order
    pub completed_operation_ids: Vec<String>,
    /// Operations that failed while this workflow ran
    pub failed_operation_ids: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowCheckpoint {
    /// Open a fresh checkpoint at step 0.
    pub fn start(
        workflow_type: impl Into<String>,
        total_steps: u32,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("cp_{}", Uuid::new_v4()),
            workflow_id: format!("wf_{}", Uuid::new_v4()),
            workflow_type: workflow_type.into(),
            status: WorkflowStatus::Running,
            step_number: 0,
            total_steps,
            state_data: serde_json::Map::new(),
            completed_operation_ids: Vec::new(),
            failed_operation_ids: Vec::new(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// The reference addressing this checkpoint.
    pub fn reference(&self) -> UniversalReference {
        UniversalReference::checkpoint(&self.id)
    }

    /// Completed fraction as a percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_steps == 0 {
            0.0
        } else {
            self.step_number as f32 / self.total_steps as f32 * 100.0
        }
    }

    /// Merge state updates; later keys overwrite earlier ones.
    pub fn merge_state(&mut self, updates: serde_json::Map<String, serde_json::Value>) {
        for (k, v) in updates {
            self.state_data.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Scenario: 5 of 10 steps reports 50% ===
    #[test]
    fn progress_percent_midway() {
        let mut cp = WorkflowCheckpoint::start("ingestion", 10, Default::default());
        cp.step_number = 5;
        assert_eq!(cp.progress_percent(), 50.0);
    }

    // === Scenario: Later state keys overwrite earlier ones ===
    #[test]
    fn merge_state_overwrites() {
        let mut cp = WorkflowCheckpoint::start("ingestion", 3, Default::default());

        let mut first = serde_json::Map::new();
        first.insert("cursor".into(), json!("chunk_1"));
        first.insert("seen".into(), json!(1));
        cp.merge_state(first);

        let mut second = serde_json::Map::new();
        second.insert("cursor".into(), json!("chunk_2"));
        cp.merge_state(second);

        assert_eq!(cp.state_data["cursor"], json!("chunk_2"));
        assert_eq!(cp.state_data["seen"], json!(1));
    }
}
