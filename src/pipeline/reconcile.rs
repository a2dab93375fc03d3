//! Saga reconciliation — finding orphaned references
//!
//! Cross-store writes have no multi-store atomicity. A step that fails or
//! times out after writing to the graph or vector store leaves references
//! whose producing operation never completed. This pass detects them so a
//! cleanup job can delete or re-derive the objects; nothing is rolled back
//! automatically.

use crate::error::WeftResult;
use crate::model::OperationStatus;
use crate::reference::UniversalReference;
use crate::storage::RelationalStore;
use chrono::{Duration, Utc};
use tracing::debug;

/// An output reference whose producing operation did not complete.
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanedRef {
    pub reference: UniversalReference,
    pub operation_id: String,
    pub operation_status: OperationStatus,
}

/// What a reconciliation pass found.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    /// Outputs of failed operations, marked for cleanup
    pub orphaned_refs: Vec<OrphanedRef>,
    /// Operations still `running` past the staleness horizon, likely
    /// crashed workers that never reached their completion path
    pub stale_operation_ids: Vec<String>,
}

/// Scan the operation log for orphaned outputs and stale runners.
///
/// `stale_after` is the grace period for running operations: anything
/// started earlier than `now - stale_after` is reported as stale. Failed
/// operations may carry partial output refs (recorded at failure time);
/// all of those are orphans by definition.
pub fn reconcile_orphans(
    relational: &dyn RelationalStore,
    stale_after: Duration,
) -> WeftResult<ReconciliationReport> {
    let mut report = ReconciliationReport::default();

    for record in relational.operations_by_status(OperationStatus::Failed)? {
        for reference in record.output_refs {
            report.orphaned_refs.push(OrphanedRef {
                reference,
                operation_id: record.id.clone(),
                operation_status: OperationStatus::Failed,
            });
        }
    }

    let horizon = Utc::now() - stale_after;
    for record in relational.operations_by_status(OperationStatus::Running)? {
        if record.started_at < horizon {
            report.stale_operation_ids.push(record.id);
        }
    }

    debug!(
        orphans = report.orphaned_refs.len(),
        stale = report.stale_operation_ids.len(),
        "reconciliation pass finished"
    );
    Ok(report)
}
