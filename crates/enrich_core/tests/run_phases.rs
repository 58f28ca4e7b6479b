use enrich_core::{BatchRun, ItemOutcome, ItemStage, RunPhase, WorkItem};

fn running() -> BatchRun {
    let mut run = BatchRun::new();
    run.advance(RunPhase::Reconciling).unwrap();
    run.advance(RunPhase::Running).unwrap();
    run
}

#[test]
fn phases_follow_the_run_lifecycle() {
    let mut run = BatchRun::new();
    assert_eq!(run.phase(), RunPhase::Init);
    assert!(run.advance(RunPhase::Running).is_err());
    run.advance(RunPhase::Reconciling).unwrap();
    run.advance(RunPhase::Running).unwrap();
    run.advance(RunPhase::Draining).unwrap();
    run.advance(RunPhase::Done).unwrap();
    assert!(run.phase().is_terminal());
}

#[test]
fn empty_queue_goes_straight_to_done() {
    let mut run = BatchRun::new();
    run.advance(RunPhase::Reconciling).unwrap();
    assert_eq!(run.advance(RunPhase::Done), Ok(RunPhase::Done));
}

#[test]
fn interrupted_is_absorbing() {
    let mut run = running();
    run.advance(RunPhase::Interrupted).unwrap();
    for next in [
        RunPhase::Running,
        RunPhase::Draining,
        RunPhase::Done,
        RunPhase::Reconciling,
    ] {
        assert!(run.advance(next).is_err());
    }
}

#[test]
fn outcomes_only_recorded_while_running() {
    let mut run = BatchRun::new();
    let err = run.record(&ItemOutcome::completed(0, "x")).unwrap_err();
    assert_eq!(err.from, RunPhase::Init);
    assert_eq!(run.attempted(), 0);
}

#[test]
fn scenario_tallies_and_success_rate() {
    let source = vec![
        WorkItem::new("X", "x"),
        WorkItem::new("Y", "y"),
        WorkItem::new("Z", "z"),
    ];
    let mut run = running();
    run.record(&ItemOutcome::completed(0, "X")).unwrap();
    let failure = ItemOutcome::enrichment_failed(1, "Y", "timeout");
    assert_eq!(failure.stage(), ItemStage::Failed);
    run.record(&failure).unwrap();
    run.record(&ItemOutcome::completed(2, "Z")).unwrap();
    run.advance(RunPhase::Draining).unwrap();
    run.advance(RunPhase::Done).unwrap();

    let summary = run.summary(&source);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed_this_run, 1);
    assert!(!summary.interrupted);
    assert_eq!(summary.last_index, 2);
    assert!((summary.success_rate() - 66.666).abs() < 0.01);
    assert!(run.progress().is_disjoint());
}

#[test]
fn persistence_failure_reports_enriched_stage() {
    let outcome = ItemOutcome::persistence_failed(4, "Q", "disk full");
    match outcome {
        ItemOutcome::Failed { failure, .. } => {
            assert_eq!(failure.stage_reached(), ItemStage::Enriched);
            assert_eq!(failure.to_string(), "failed to save Q: disk full");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn interrupted_retry_keeps_unreached_names_failed() {
    let mut run = running();
    run.record(&ItemOutcome::completed(0, "Y")).unwrap();
    assert!(run.restore_unattempted(["W"]).is_err());

    run.advance(RunPhase::Interrupted).unwrap();
    let restored = run.restore_unattempted(["W", "Y"]).unwrap();

    assert_eq!(restored, 1);
    assert!(run.progress().is_failed("W"));
    assert!(run.progress().is_completed("Y"));
    assert!(!run.progress().is_failed("Y"));
    assert!(run.progress().is_disjoint());
}
