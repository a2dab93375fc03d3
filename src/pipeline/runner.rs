//! Async step runner — one tool invocation under full bookkeeping

use crate::error::{WeftError, WeftResult};
use crate::model::OperationStatus;
use crate::provenance::ProvenanceService;
use crate::reference::UniversalReference;
use crate::workflow::WorkflowStateService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Binds a step to a position in a workflow.
#[derive(Debug, Clone)]
pub struct WorkflowBinding {
    pub workflow_id: String,
    pub step_number: u32,
}

/// Description of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolStep {
    pub tool_id: String,
    pub operation_type: String,
    pub input_refs: Vec<UniversalReference>,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub workflow: Option<WorkflowBinding>,
    pub timeout: Duration,
}

impl ToolStep {
    pub fn new(tool_id: impl Into<String>, operation_type: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            operation_type: operation_type.into(),
            input_refs: Vec::new(),
            parameters: serde_json::Map::new(),
            workflow: None,
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_inputs(mut self, input_refs: Vec<UniversalReference>) -> Self {
        self.input_refs = input_refs;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_workflow(mut self, workflow_id: impl Into<String>, step_number: u32) -> Self {
        self.workflow = Some(WorkflowBinding {
            workflow_id: workflow_id.into(),
            step_number,
        });
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What a step body hands back on success.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    /// References the tool produced (must already be registered)
    pub output_refs: Vec<UniversalReference>,
    /// The tool's confidence in this invocation
    pub confidence: f32,
    /// Workflow state to merge at the step boundary
    pub state_updates: serde_json::Map<String, serde_json::Value>,
}

impl StepOutput {
    pub fn new(output_refs: Vec<UniversalReference>, confidence: f32) -> Self {
        Self {
            output_refs,
            confidence,
            state_updates: serde_json::Map::new(),
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state_updates.insert(key.into(), value);
        self
    }
}

/// The result of a successfully run step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub operation_id: String,
    pub output_refs: Vec<UniversalReference>,
    /// Quality warnings recorded while folding confidence into outputs
    pub warnings: Vec<String>,
}

/// Runs tool steps under provenance, deadline, and workflow bookkeeping.
pub struct PipelineRunner {
    provenance: Arc<ProvenanceService>,
    workflow: Arc<WorkflowStateService>,
}

impl PipelineRunner {
    pub fn new(provenance: Arc<ProvenanceService>, workflow: Arc<WorkflowStateService>) -> Self {
        Self {
            provenance,
            workflow,
        }
    }

    /// Execute one step: open the operation, run the body under the step's
    /// deadline, close the operation, and advance the bound workflow.
    ///
    /// On body error or timeout the operation is closed as `failed`
    /// (`error_message = "timeout"` on deadline expiry) and the failure is
    /// recorded on the workflow without terminating it; the caller decides
    /// whether to retry, skip, or abort. Partial writes from a failed body
    /// are not rolled back; the reconciliation pass finds them later.
    pub async fn run_step<F, Fut>(&self, step: ToolStep, body: F) -> WeftResult<StepOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = WeftResult<StepOutput>>,
    {
        let operation_id = self.provenance.start_operation(
            &step.operation_type,
            &step.tool_id,
            step.input_refs.clone(),
            step.parameters.clone(),
        )?;

        match tokio::time::timeout(step.timeout, body()).await {
            Ok(Ok(output)) => {
                let warnings = self.provenance.complete_operation(
                    &operation_id,
                    output.output_refs.clone(),
                    OperationStatus::Completed,
                    output.confidence,
                    None,
                )?;
                if let Some(binding) = &step.workflow {
                    self.workflow.update_progress(
                        &binding.workflow_id,
                        binding.step_number,
                        Some(&operation_id),
                        output.state_updates,
                    )?;
                }
                Ok(StepOutcome {
                    operation_id,
                    output_refs: output.output_refs,
                    warnings,
                })
            }
            Ok(Err(err)) => {
                self.record_failure(&operation_id, &err.to_string(), step.workflow.as_ref());
                Err(err)
            }
            Err(_elapsed) => {
                self.record_failure(&operation_id, "timeout", step.workflow.as_ref());
                Err(WeftError::Timeout(format!(
                    "{} via {} exceeded {:?}",
                    step.operation_type, step.tool_id, step.timeout
                )))
            }
        }
    }

    /// Close the operation as failed and note it on the workflow. Best
    /// effort: bookkeeping errors are logged rather than masking the
    /// step's own failure.
    fn record_failure(
        &self,
        operation_id: &str,
        error_message: &str,
        binding: Option<&WorkflowBinding>,
    ) {
        if let Err(err) = self.provenance.fail_operation(operation_id, error_message) {
            warn!(operation = operation_id, error = %err, "could not mark operation failed");
        }
        if let Some(binding) = binding {
            if let Err(err) = self
                .workflow
                .record_operation_failure(&binding.workflow_id, operation_id)
            {
                warn!(workflow = %binding.workflow_id, error = %err, "could not record step failure");
            }
        }
    }
}
