//! Workflow state service — progress tracking and resumable checkpoints
//!
//! A workflow is a multi-step pipeline run. Its checkpoint is rewritten at
//! every step boundary so a restarted process resumes from the last
//! completed step instead of from scratch. Step numbers are monotonic;
//! updates for one workflow are serialized while distinct workflows proceed
//! fully in parallel.

mod service;

pub use service::{WorkflowProgress, WorkflowStateService};
