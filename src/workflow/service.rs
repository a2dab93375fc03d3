//! Workflow state service implementation

use crate::error::{WeftError, WeftResult};
use crate::model::{WorkflowCheckpoint, WorkflowStatus};
use crate::storage::RelationalStore;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Point-in-time view of a workflow's progress
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowProgress {
    pub status: WorkflowStatus,
    pub progress_percent: f32,
    pub current_step: u32,
    pub total_steps: u32,
}

/// Tracks multi-step workflow progress and persists checkpoints.
///
/// Updates for a single workflow are serialized through a per-workflow
/// mutex because step numbers must be monotonic; different workflows share
/// nothing and proceed in parallel.
pub struct WorkflowStateService {
    relational: Arc<dyn RelationalStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WorkflowStateService {
    pub fn new(relational: Arc<dyn RelationalStore>) -> Self {
        Self {
            relational,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, workflow_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(workflow_id.to_string())
            .or_default()
            .clone()
    }

    fn load(&self, workflow_id: &str) -> WeftResult<WorkflowCheckpoint> {
        self.relational
            .load_checkpoint(workflow_id)?
            .ok_or_else(|| WeftError::NotFound(format!("workflow {}", workflow_id)))
    }

    /// Open a new workflow and persist its initial checkpoint.
    pub fn start_workflow(
        &self,
        workflow_type: &str,
        total_steps: u32,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> WeftResult<String> {
        if total_steps < 1 {
            return Err(WeftError::Validation(
                "total_steps must be at least 1".into(),
            ));
        }
        let checkpoint = WorkflowCheckpoint::start(workflow_type, total_steps, metadata);
        self.relational.save_checkpoint(&checkpoint)?;
        info!(workflow = %checkpoint.workflow_id, workflow_type, total_steps, "workflow started");
        Ok(checkpoint.workflow_id)
    }

    /// Record progress at a step boundary and persist the checkpoint.
    ///
    /// Step numbers must be monotonically non-decreasing: a rewind fails
    /// with an out-of-order error and does not mutate state. State updates
    /// merge into accumulated state, later keys overwriting earlier ones.
    pub fn update_progress(
        &self,
        workflow_id: &str,
        step_number: u32,
        operation_id: Option<&str>,
        state_updates: serde_json::Map<String, serde_json::Value>,
    ) -> WeftResult<WorkflowCheckpoint> {
        let lock = self.lock_for(workflow_id);
        let _guard = lock.lock().unwrap();

        let mut checkpoint = self.load(workflow_id)?;
        if checkpoint.status != WorkflowStatus::Running {
            return Err(WeftError::InvalidState {
                subject: format!("workflow {}", workflow_id),
                expected: "RUNNING".into(),
                actual: checkpoint.status.to_string(),
            });
        }
        if step_number < checkpoint.step_number {
            return Err(WeftError::OutOfOrder {
                workflow_id: workflow_id.to_string(),
                last: checkpoint.step_number,
                attempted: step_number,
            });
        }
        if step_number > checkpoint.total_steps {
            return Err(WeftError::Validation(format!(
                "step {} exceeds total_steps {}",
                step_number, checkpoint.total_steps
            )));
        }

        checkpoint.step_number = step_number;
        checkpoint.merge_state(state_updates);
        if let Some(op) = operation_id {
            checkpoint.completed_operation_ids.push(op.to_string());
        }
        checkpoint.updated_at = Utc::now();
        self.relational.save_checkpoint(&checkpoint)?;
        Ok(checkpoint)
    }

    /// Record a failed operation without terminating the workflow.
    ///
    /// Callers decide whether to retry, skip, or abort; this keeps the
    /// failure visible in the checkpoint either way.
    pub fn record_operation_failure(
        &self,
        workflow_id: &str,
        operation_id: &str,
    ) -> WeftResult<()> {
        let lock = self.lock_for(workflow_id);
        let _guard = lock.lock().unwrap();

        let mut checkpoint = self.load(workflow_id)?;
        checkpoint
            .failed_operation_ids
            .push(operation_id.to_string());
        checkpoint.updated_at = Utc::now();
        self.relational.save_checkpoint(&checkpoint)?;
        Ok(())
    }

    /// Current status and progress for a workflow.
    pub fn get_workflow_status(&self, workflow_id: &str) -> WeftResult<WorkflowProgress> {
        let checkpoint = self.load(workflow_id)?;
        Ok(WorkflowProgress {
            status: checkpoint.status,
            progress_percent: checkpoint.progress_percent(),
            current_step: checkpoint.step_number,
            total_steps: checkpoint.total_steps,
        })
    }

    /// Write the terminal COMPLETED checkpoint.
    pub fn complete_workflow(
        &self,
        workflow_id: &str,
        final_state: serde_json::Map<String, serde_json::Value>,
    ) -> WeftResult<WorkflowCheckpoint> {
        self.terminate(workflow_id, WorkflowStatus::Completed, final_state, None)
    }

    /// Write the terminal FAILED checkpoint, recording the triggering
    /// operation for diagnosis.
    pub fn mark_failed(
        &self,
        workflow_id: &str,
        triggering_operation_id: Option<&str>,
    ) -> WeftResult<WorkflowCheckpoint> {
        self.terminate(
            workflow_id,
            WorkflowStatus::Failed,
            serde_json::Map::new(),
            triggering_operation_id,
        )
    }

    /// Reload the last persisted checkpoint so a restarted process can
    /// continue from the last completed step.
    pub fn resume_workflow(&self, workflow_id: &str) -> WeftResult<WorkflowCheckpoint> {
        let checkpoint = self.load(workflow_id)?;
        info!(
            workflow = %workflow_id,
            step = checkpoint.step_number,
            status = %checkpoint.status,
            "resuming from checkpoint"
        );
        Ok(checkpoint)
    }

    fn terminate(
        &self,
        workflow_id: &str,
        status: WorkflowStatus,
        final_state: serde_json::Map<String, serde_json::Value>,
        triggering_operation_id: Option<&str>,
    ) -> WeftResult<WorkflowCheckpoint> {
        let lock = self.lock_for(workflow_id);
        let _guard = lock.lock().unwrap();

        let mut checkpoint = self.load(workflow_id)?;
        if checkpoint.status.is_terminal() {
            return Err(WeftError::InvalidState {
                subject: format!("workflow {}", workflow_id),
                expected: "RUNNING".into(),
                actual: checkpoint.status.to_string(),
            });
        }
        checkpoint.status = status;
        checkpoint.merge_state(final_state);
        if let Some(op) = triggering_operation_id {
            checkpoint.failed_operation_ids.push(op.to_string());
            warn!(workflow = %workflow_id, operation = op, "workflow failed");
        }
        checkpoint.updated_at = Utc::now();
        self.relational.save_checkpoint(&checkpoint)?;
        Ok(checkpoint)
    }
}
