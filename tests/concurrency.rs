//! Concurrency guarantees: atomic minting, one-shot completion, parallel workflows

mod common;

use common::memory_stack;
use std::collections::HashSet;
use std::sync::Arc;
use weft::{OperationStatus, WeftError};

// === Scenario: concurrent surface-form minting yields one reference ===
#[test]
fn concurrent_surface_form_minting() {
    let stack = Arc::new(memory_stack());
    let chunk = stack.chunk("c1");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let stack = stack.clone();
        let chunk = chunk.clone();
        handles.push(std::thread::spawn(move || {
            stack
                .identity
                .create_surface_form("Apple Inc.", "ctx", &chunk, 0, 10)
                .unwrap()
        }));
    }
    let refs: HashSet<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().to_string())
        .collect();
    assert_eq!(refs.len(), 1, "identical spans must share one reference");
}

// === Scenario: concurrent entity resolution converges on one entity ===
#[test]
fn concurrent_entity_resolution() {
    let stack = Arc::new(memory_stack());
    let chunk = stack.chunk("c1");

    let mut handles = Vec::new();
    for worker in 0..8 {
        let stack = stack.clone();
        let chunk = chunk.clone();
        handles.push(std::thread::spawn(move || {
            // Each worker sees the span at a different offset: distinct
            // mentions, one canonical entity.
            let start = worker * 16;
            let mention = stack.mention(&chunk, "Apple Inc.", start, "ORGANIZATION", 0.9);
            stack
                .identity
                .resolve_entity(&mention, &[], true)
                .unwrap()
                .to_string()
        }));
    }
    let entities: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(entities.len(), 1, "all workers must resolve to one entity");
}

// === Scenario: racing completers, exactly one wins and the record keeps its outcome ===
#[test]
fn concurrent_completion_is_exclusive() {
    let stack = Arc::new(memory_stack());
    let chunk = stack.chunk("c1");
    let mention = stack.mention(&chunk, "Apple Inc.", 0, "ORGANIZATION", 0.9);
    let entity = stack.identity.resolve_entity(&mention, &[], true).unwrap();

    let op = stack
        .provenance
        .start_operation("entity_resolution", "t", vec![mention], Default::default())
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let stack = stack.clone();
        let op = op.clone();
        let entity = entity.clone();
        handles.push(std::thread::spawn(move || {
            stack.provenance.complete_operation(
                &op,
                vec![entity],
                OperationStatus::Completed,
                0.5 + i as f32 * 0.1,
                None,
            )
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one completer must win");
    for loss in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            loss.as_ref().unwrap_err(),
            WeftError::InvalidState { .. }
        ));
    }

    let record = stack.provenance.get_operation(&op).unwrap();
    assert_eq!(record.status, OperationStatus::Completed);
}

// === Scenario: distinct workflows proceed fully in parallel ===
#[test]
fn workflows_are_independent() {
    let stack = Arc::new(memory_stack());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let stack = stack.clone();
        handles.push(std::thread::spawn(move || {
            let wf = stack
                .workflow
                .start_workflow("ingestion", 5, Default::default())
                .unwrap();
            for step in 1..=5 {
                stack
                    .workflow
                    .update_progress(&wf, step, None, Default::default())
                    .unwrap();
            }
            stack
                .workflow
                .complete_workflow(&wf, Default::default())
                .unwrap();
            wf
        }));
    }
    for h in handles {
        let wf = h.join().unwrap();
        let progress = stack.workflow.get_workflow_status(&wf).unwrap();
        assert_eq!(progress.progress_percent, 100.0);
    }
}

// === Scenario: lineage reads stay consistent under concurrent writes ===
#[test]
fn lineage_reads_during_writes() {
    let stack = Arc::new(memory_stack());
    let chunk = stack.chunk("c1");
    let mention = stack.mention(&chunk, "Apple Inc.", 0, "ORGANIZATION", 0.9);
    let entity = stack.identity.resolve_entity(&mention, &[], true).unwrap();

    let writer = {
        let stack = stack.clone();
        let mention = mention.clone();
        let entity = entity.clone();
        std::thread::spawn(move || {
            for _ in 0..20 {
                let op = stack
                    .provenance
                    .start_operation(
                        "enrichment",
                        "t",
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
                        0.9,
                        None,
                    )
                    .unwrap();
            }
        })
    };

    // Readers must only ever observe closed records in lineage results
    for _ in 0..50 {
        let lineage = stack
            .provenance
            .get_lineage(&entity, weft::LineageDirection::Backward, 3)
            .unwrap();
        for record in lineage {
            assert_ne!(record.status, OperationStatus::Running);
            assert!(record.completed_at.is_some());
        }
    }
    writer.join().unwrap();
}
