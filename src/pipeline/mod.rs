//! Pipeline layer — running tools under provenance, timeouts, and sagas
//!
//! Services below this layer are synchronous and lock-light; the pipeline
//! is where async tool work meets them. A step runner wraps each tool
//! invocation with an operation record, a deadline, a quality fold, and an
//! optional workflow binding. Cross-store writes have no multi-store
//! atomicity, so each step is a saga participant: partial writes from a
//! failed or timed-out step are left in place and picked up by the
//! reconciliation pass.

mod reconcile;
mod runner;
mod tool;

pub use reconcile::{reconcile_orphans, OrphanedRef, ReconciliationReport};
pub use runner::{PipelineRunner, StepOutcome, StepOutput, ToolStep, WorkflowBinding};
pub use tool::{ExtractionTool, RawSpan, ToolError};
