//! Persistence: checkpoint resume, lineage durability, reconciliation

mod common;

use common::sqlite_stack;
use serde_json::json;
use weft::{
    reconcile_orphans, LineageDirection, OperationStatus, UniversalReference, VectorIndex,
    WorkflowStatus,
};

fn state(key: &str, value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    let mut m = serde_json::Map::new();
    m.insert(key.to_string(), value);
    m
}

// === Scenario: a restarted process resumes from the last completed step ===
#[test]
fn resume_workflow_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("weft.db");

    let workflow_id = {
        let stack = sqlite_stack(&db);
        let wf = stack
            .workflow
            .start_workflow("document_ingestion", 4, Default::default())
            .unwrap();
        stack
            .workflow
            .update_progress(&wf, 1, Some("op_1"), state("cursor", json!("chunk_1")))
            .unwrap();
        stack
            .workflow
            .update_progress(&wf, 2, Some("op_2"), state("cursor", json!("chunk_2")))
            .unwrap();
        wf
        // Stack dropped; simulates a process crash after step 2
    };

    let stack = sqlite_stack(&db);
    let checkpoint = stack.workflow.resume_workflow(&workflow_id).unwrap();
    assert_eq!(checkpoint.status, WorkflowStatus::Running);
    assert_eq!(checkpoint.step_number, 2);
    assert_eq!(checkpoint.state_data["cursor"], json!("chunk_2"));
    assert_eq!(
        checkpoint.completed_operation_ids,
        vec!["op_1".to_string(), "op_2".to_string()]
    );

    // Continue from step 3 rather than from scratch
    stack
        .workflow
        .update_progress(&workflow_id, 3, Some("op_3"), Default::default())
        .unwrap();
    stack
        .workflow
        .update_progress(&workflow_id, 4, Some("op_4"), Default::default())
        .unwrap();
    let finished = stack
        .workflow
        .complete_workflow(&workflow_id, state("result", json!("done")))
        .unwrap();
    assert_eq!(finished.status, WorkflowStatus::Completed);
    assert_eq!(finished.progress_percent(), 100.0);
}

// === Scenario: lineage and statistics survive a restart ===
#[test]
fn lineage_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("weft.db");

    let (mention, entity, op) = {
        let stack = sqlite_stack(&db);
        let chunk = stack.chunk("c1");
        let mention = stack.mention(&chunk, "Apple Inc.", 0, "ORGANIZATION", 0.9);
        let entity = stack.identity.resolve_entity(&mention, &[], true).unwrap();
        let op = stack
            .provenance
            .start_operation(
                "entity_resolution",
                "resolver-v1",
                vec![mention.clone()],
                Default::default(),
            )
            .unwrap();
        stack
            .provenance
            .complete_operation(
                &op,
                vec![entity.clone()],
                OperationStatus::Completed,
                0.95,
                None,
            )
            .unwrap();
        (mention, entity, op)
    };

    let stack = sqlite_stack(&db);
    let backward = stack
        .provenance
        .get_lineage(&entity, LineageDirection::Backward, 10)
        .unwrap();
    assert_eq!(backward.len(), 1);
    assert_eq!(backward[0].id, op);
    assert_eq!(backward[0].input_refs, vec![mention]);

    let stats = stack.provenance.get_tool_statistics("resolver-v1").unwrap();
    assert_eq!(stats.total_calls, 1);
    assert_eq!(stats.successful_calls, 1);
    assert!(stats.last_used.is_some());
}

// === Scenario: reconciliation finds orphans left by a failed step ===
#[test]
fn reconciliation_after_failed_step() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("weft.db");

    {
        let stack = sqlite_stack(&db);
        let chunk = stack.chunk("c1");
        let mention = stack.mention(&chunk, "Apple Inc.", 0, "ORGANIZATION", 0.9);

        // A step that wrote a vector, then failed before finishing. Its
        // partial output is recorded with the failure.
        let vector_ref = UniversalReference::vector("v_partial");
        stack
            .vector
            .add_vectors(&[vec![0.5, 0.5]], std::slice::from_ref(&vector_ref))
            .unwrap();
        let op = stack
            .provenance
            .start_operation("embedding", "embedder-v1", vec![mention], Default::default())
            .unwrap();
        stack
            .provenance
            .complete_operation(
                &op,
                vec![vector_ref],
                OperationStatus::Failed,
                0.0,
                Some("store write interrupted".into()),
            )
            .unwrap();
    }

    let stack = sqlite_stack(&db);
    let report = reconcile_orphans(stack.relational.as_ref(), chrono::Duration::minutes(5)).unwrap();
    assert_eq!(report.orphaned_refs.len(), 1);
    assert_eq!(report.orphaned_refs[0].reference.id(), "v_partial");
    assert_eq!(
        report.orphaned_refs[0].operation_status,
        OperationStatus::Failed
    );
    assert!(report.stale_operation_ids.is_empty());
}
