//! Provenance service implementation

use crate::error::{WeftError, WeftResult};
use crate::model::{clamp_confidence, OperationStatus, ProvenanceRecord, ToolStatistics};
use crate::quality::QualityService;
use crate::reference::{ReferenceResolver, UniversalReference};
use crate::storage::RelationalStore;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Direction for lineage traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageDirection {
    /// Walk `input_refs ← output_refs` edges toward roots
    Backward,
    /// Walk `output_refs → input_refs` edges toward derived objects
    Forward,
}

/// Records operation start/completion and answers lineage queries.
///
/// Completion folds the operation's confidence into each output's stored
/// quality via the [`QualityService`]. Lineage and statistics reads take no
/// locks; they see committed records only, never a partially written one.
pub struct ProvenanceService {
    relational: Arc<dyn RelationalStore>,
    quality: Arc<QualityService>,
    resolver: ReferenceResolver,
}

impl ProvenanceService {
    pub fn new(
        relational: Arc<dyn RelationalStore>,
        quality: Arc<QualityService>,
        resolver: ReferenceResolver,
    ) -> Self {
        Self {
            relational,
            quality,
            resolver,
        }
    }

    /// Open an operation in the `running` state.
    ///
    /// Every input reference must resolve; dangling inputs fail with a
    /// not-found error before anything is recorded.
    pub fn start_operation(
        &self,
        operation_type: &str,
        tool_id: &str,
        input_refs: Vec<UniversalReference>,
        parameters: serde_json::Map<String, serde_json::Value>,
    ) -> WeftResult<String> {
        for r in &input_refs {
            if !self.resolver.exists(r)? {
                return Err(WeftError::NotFound(r.to_string()));
            }
        }
        let record = ProvenanceRecord::start(operation_type, tool_id, input_refs, parameters);
        self.relational.insert_operation(&record)?;
        info!(operation = %record.id, operation_type, tool_id, "operation started");
        Ok(record.id)
    }

    /// Close an operation, transitioning it `running → completed|failed`.
    ///
    /// The transition is one-shot: a second completion attempt fails with
    /// an invalid-state error and the stored record keeps the first outcome.
    /// On success the operation's confidence is folded into each output's
    /// stored quality; the returned warnings list any degradation applied.
    /// A hard error mid-completion still marks the record `failed`; it is
    /// never left `running`.
    pub fn complete_operation(
        &self,
        operation_id: &str,
        output_refs: Vec<UniversalReference>,
        status: OperationStatus,
        confidence: f32,
        error_message: Option<String>,
    ) -> WeftResult<Vec<String>> {
        if status == OperationStatus::Running {
            return Err(WeftError::Validation(
                "completion status must be completed or failed".into(),
            ));
        }
        let record = self
            .relational
            .get_operation(operation_id)?
            .ok_or_else(|| WeftError::NotFound(format!("operation {}", operation_id)))?;
        if record.status != OperationStatus::Running {
            return Err(WeftError::InvalidState {
                subject: format!("operation {}", operation_id),
                expected: "running".into(),
                actual: record.status.to_string(),
            });
        }

        match self.finish(record.clone(), output_refs, status, confidence, error_message) {
            Ok(warnings) => Ok(warnings),
            Err(err) => {
                self.mark_failed_best_effort(record, &err);
                Err(err)
            }
        }
    }

    /// Close an operation as failed with an error message.
    ///
    /// The timeout path uses this with `error_message = "timeout"`.
    pub fn fail_operation(&self, operation_id: &str, error_message: &str) -> WeftResult<()> {
        self.complete_operation(
            operation_id,
            Vec::new(),
            OperationStatus::Failed,
            0.0,
            Some(error_message.to_string()),
        )?;
        Ok(())
    }

    /// Load a record by id.
    pub fn get_operation(&self, operation_id: &str) -> WeftResult<ProvenanceRecord> {
        self.relational
            .get_operation(operation_id)?
            .ok_or_else(|| WeftError::NotFound(format!("operation {}", operation_id)))
    }

    /// Walk the lineage DAG from a reference.
    ///
    /// Breadth-first, deduplicating revisited operations, stopping after
    /// `max_depth` hops or when no further edges exist. Returns operations
    /// in discovery order, nearest first.
    pub fn get_lineage(
        &self,
        origin: &UniversalReference,
        direction: LineageDirection,
        max_depth: usize,
    ) -> WeftResult<Vec<ProvenanceRecord>> {
        let mut discovered: Vec<ProvenanceRecord> = Vec::new();
        let mut visited_ops: HashSet<String> = HashSet::new();
        let mut seen_refs: HashSet<String> = HashSet::new();
        seen_refs.insert(origin.to_string());

        let mut frontier: Vec<UniversalReference> = vec![origin.clone()];
        for _depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }
            let mut next_frontier: Vec<UniversalReference> = Vec::new();
            for r in &frontier {
                let ops = match direction {
                    LineageDirection::Backward => self.relational.operations_producing(r)?,
                    LineageDirection::Forward => self.relational.operations_consuming(r)?,
                };
                for op in ops {
                    if !visited_ops.insert(op.id.clone()) {
                        continue;
                    }
                    let onward = match direction {
                        LineageDirection::Backward => &op.input_refs,
                        LineageDirection::Forward => &op.output_refs,
                    };
                    for next_ref in onward {
                        if seen_refs.insert(next_ref.to_string()) {
                            next_frontier.push(next_ref.clone());
                        }
                    }
                    discovered.push(op);
                }
            }
            frontier = next_frontier;
        }
        Ok(discovered)
    }

    /// Aggregated statistics for a tool. Pure read; tools never called
    /// report zeroed statistics.
    pub fn get_tool_statistics(&self, tool_id: &str) -> WeftResult<ToolStatistics> {
        Ok(self
            .relational
            .get_tool_statistics(tool_id)?
            .unwrap_or_else(|| ToolStatistics::empty(tool_id)))
    }

    fn finish(
        &self,
        mut record: ProvenanceRecord,
        output_refs: Vec<UniversalReference>,
        status: OperationStatus,
        confidence: f32,
        error_message: Option<String>,
    ) -> WeftResult<Vec<String>> {
        for r in &output_refs {
            if !self.resolver.exists(r)? {
                return Err(WeftError::NotFound(r.to_string()));
            }
        }

        // Compute quality before transitioning so a quality failure can
        // still fail the record instead of leaving it completed.
        let mut warnings = Vec::new();
        let folded = if status == OperationStatus::Completed {
            let mut params = record.parameters.clone();
            params.insert("output_count".into(), json!(output_refs.len() as u64));
            let (propagated, quality_warnings) = self.quality.propagate_quality(
                &record.input_refs,
                &record.operation_type,
                &params,
            )?;
            warnings = quality_warnings;
            Some(propagated.min(clamp_confidence(confidence)))
        } else {
            None
        };

        let now = Utc::now();
        record.status = status;
        record.confidence = Some(clamp_confidence(confidence));
        record.duration_ms = Some((now - record.started_at).num_milliseconds());
        record.completed_at = Some(now);
        record.output_refs = output_refs;
        record.error_message = error_message;

        if !self.relational.transition_operation(&record)? {
            // A concurrent completer won; the stored record keeps its outcome.
            return Err(WeftError::InvalidState {
                subject: format!("operation {}", record.id),
                expected: "running".into(),
                actual: "already completed".into(),
            });
        }
        self.relational.record_tool_call(
            &record.tool_id,
            status == OperationStatus::Completed,
            record.duration_ms.unwrap_or(0),
        )?;

        if let Some(folded) = folded {
            self.quality.fold_into_outputs(&record.output_refs, folded)?;
            for warning in &warnings {
                warn!(operation = %record.id, "{}", warning);
            }
        }
        info!(operation = %record.id, status = %status, "operation closed");
        Ok(warnings)
    }

    /// Mark a record failed after a hard completion error. Best effort: the
    /// record must not stay `running`, but a storage failure here cannot
    /// mask the original error.
    fn mark_failed_best_effort(&self, mut record: ProvenanceRecord, err: &WeftError) {
        let now = Utc::now();
        record.status = OperationStatus::Failed;
        record.confidence = Some(0.0);
        record.duration_ms = Some((now - record.started_at).num_milliseconds());
        record.completed_at = Some(now);
        record.output_refs = Vec::new();
        record.error_message = Some(err.to_string());
        // Only count the call if this attempt actually closed the record; a
        // lost completion race leaves the winner's bookkeeping untouched.
        if let Ok(true) = self.relational.transition_operation(&record) {
            let _ = self.relational.record_tool_call(
                &record.tool_id,
                false,
                record.duration_ms.unwrap_or(0),
            );
            warn!(operation = %record.id, error = %err, "operation failed during completion");
        }
    }
}
