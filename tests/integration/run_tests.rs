use std::sync::atomic::Ordering;

use video_recorder::orchestrator::run_resource;
use video_recorder::AppError;

use super::test_helpers::{resource, Event, Harness, SLUG};

#[tokio::test(start_paused = true)]
async fn notification_failure_does_not_fail_run() {
    let harness = Harness::new(2);
    harness.notifier.fail.store(true, Ordering::SeqCst);

    let summary = run_resource(&harness.ctx(), &resource(&[1, 1, 1]))
        .await
        .unwrap();

    assert!(summary.completed);
    assert!(!summary.announced);
    assert_eq!(harness.log.count(&Event::Published), 1);
    assert_eq!(harness.log.count(&Event::CheckpointDeleted), 1);
}

#[tokio::test(start_paused = true)]
async fn completion_event_describes_chunk_directory() {
    let harness = Harness::new(2);
    run_resource(&harness.ctx(), &resource(&[1]))
        .await
        .unwrap();

    let published = harness.notifier.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1);
    let event = &published[0];
    assert_eq!(event.title, "Course");
    assert_eq!(event.slug, SLUG);
    assert_eq!(event.chunk_dir_path, "/recordings/videos");
    assert_eq!(event.path, "/recordings/videos");
    assert_eq!(event.extension, "webm");
    assert_eq!(event.output_path, "/recordings/output");
}

#[tokio::test(start_paused = true)]
async fn final_checkpoint_kept_when_clearing_disabled() {
    let mut harness = Harness::new(2);
    harness.config.recorder.clear_checkpoint_on_completion = false;

    run_resource(&harness.ctx(), &resource(&[1, 1, 1]))
        .await
        .unwrap();

    assert_eq!(harness.store.value(SLUG), Some(3));
    assert_eq!(harness.log.count(&Event::CheckpointDeleted), 0);
}

#[tokio::test(start_paused = true)]
async fn checkpoint_cleared_on_completion_by_default() {
    let harness = Harness::new(2);
    run_resource(&harness.ctx(), &resource(&[1, 1, 1]))
        .await
        .unwrap();

    assert_eq!(harness.store.value(SLUG), None);
}

#[tokio::test(start_paused = true)]
async fn navigation_failure_is_not_fatal() {
    let harness = Harness::new(2);
    harness.session.fail_navigation.store(true, Ordering::SeqCst);

    let summary = run_resource(&harness.ctx(), &resource(&[1, 1, 1]))
        .await
        .unwrap();

    assert!(summary.completed);
    assert_eq!(harness.log.navigations(), vec![0, 1, 2]);
    assert_eq!(harness.log.checkpoint_writes(), vec![0, 2, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn fatal_navigation_error_aborts_at_chunk_start() {
    let harness = Harness::new(2);
    harness.session.broken_pipe.store(true, Ordering::SeqCst);

    let err = run_resource(&harness.ctx(), &resource(&[1, 1, 1]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Io(_)), "got {err}");
    assert!(err.is_fatal());
    assert_eq!(harness.log.navigations(), vec![0]);
    assert_eq!(harness.log.checkpoint_writes(), vec![0]);
    assert_eq!(harness.store.value(SLUG), Some(0));
    assert_eq!(harness.log.count(&Event::Published), 0);
    assert_eq!(harness.log.count(&Event::SessionClosed), 1);
}

#[tokio::test(start_paused = true)]
async fn run_ids_are_unique() {
    let harness = Harness::new(2);
    let course = resource(&[1]);
    let first = run_resource(&harness.ctx(), &course).await.unwrap();
    let second = run_resource(&harness.ctx(), &course).await.unwrap();
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test(start_paused = true)]
async fn empty_resource_completes_without_recording() {
    let harness = Harness::new(2);
    let summary = run_resource(&harness.ctx(), &resource(&[])).await.unwrap();

    assert!(summary.completed);
    assert!(summary.chunks.is_empty());
    assert_eq!(harness.log.count(&Event::CaptureStarted), 0);
    assert_eq!(harness.log.count(&Event::Published), 1);
}
