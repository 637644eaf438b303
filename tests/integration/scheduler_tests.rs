//! Chunk scheduling end to end against in-memory fakes.

use std::time::Duration;

use video_recorder::models::chunk::Chunk;
use video_recorder::orchestrator::run_resource;
use video_recorder::orchestrator::scheduler::ChunkScheduler;
use video_recorder::AppError;

use super::test_helpers::{resource, Event, Harness};

#[tokio::test(start_paused = true)]
async fn five_sub_tasks_in_chunks_of_two() {
    let harness = Harness::new(2);
    let course = resource(&[1, 1, 1, 1, 1]);

    let summary = run_resource(&harness.ctx(), &course).await.unwrap();

    let bounds: Vec<Chunk> = summary.chunks.iter().map(|report| report.chunk).collect();
    assert_eq!(
        bounds,
        vec![
            Chunk { start: 0, end: 2 },
            Chunk { start: 2, end: 4 },
            Chunk { start: 4, end: 5 },
        ]
    );

    let checkpoints: Vec<usize> = summary.observations.iter().map(|o| o.checkpoint).collect();
    assert_eq!(checkpoints, vec![2, 4, 5]);
    assert!((summary.observations[0].percentage - 40.0).abs() < f64::EPSILON);
    assert!((summary.observations[2].percentage - 100.0).abs() < f64::EPSILON);
    assert!(summary.completed);
    assert!(summary.announced);
    assert_eq!(summary.resumed_from, 0);
}

#[tokio::test(start_paused = true)]
async fn side_effects_happen_in_chunk_order() {
    let harness = Harness::new(2);
    run_resource(&harness.ctx(), &resource(&[1, 1, 1, 1, 1]))
        .await
        .unwrap();

    let opened = |name: &str| Event::ArtifactOpened(name.into());
    let closed = |name: &str| Event::ArtifactClosed(name.into());
    assert_eq!(
        harness.log.events(),
        vec![
            Event::Established,
            Event::CheckpointSet(0),
            opened("course_0.webm"),
            Event::CaptureStarted,
            Event::Navigated(0),
            Event::Navigated(1),
            closed("course_0.webm"),
            Event::CheckpointSet(2),
            Event::CheckpointSet(2),
            opened("course_2.webm"),
            Event::CaptureStarted,
            Event::Navigated(2),
            Event::Navigated(3),
            closed("course_2.webm"),
            Event::CheckpointSet(4),
            Event::CheckpointSet(4),
            opened("course_4.webm"),
            Event::CaptureStarted,
            Event::Navigated(4),
            closed("course_4.webm"),
            Event::CheckpointSet(5),
            Event::CheckpointDeleted,
            Event::Published,
            Event::SessionClosed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn checkpoint_writes_are_monotonic_and_end_at_len() {
    let harness = Harness::new(3);
    run_resource(&harness.ctx(), &resource(&[2, 5, 1, 1, 3, 4, 1]))
        .await
        .unwrap();

    let writes = harness.log.checkpoint_writes();
    assert!(writes.windows(2).all(|pair| pair[0] <= pair[1]), "{writes:?}");
    assert_eq!(writes.last(), Some(&7));
}

#[tokio::test(start_paused = true)]
async fn each_artifact_holds_one_whole_capture() {
    let harness = Harness::new(2);
    run_resource(&harness.ctx(), &resource(&[1, 1, 1, 1, 1]))
        .await
        .unwrap();

    assert_eq!(
        harness.artifacts.names(),
        vec!["course_0.webm", "course_2.webm", "course_4.webm"]
    );
    assert_eq!(harness.artifacts.contents("course_0.webm").as_deref(), Some("chunk0:end"));
    assert_eq!(harness.artifacts.contents("course_2.webm").as_deref(), Some("chunk1:end"));
    assert_eq!(harness.artifacts.contents("course_4.webm").as_deref(), Some("chunk2:end"));
}

#[tokio::test(start_paused = true)]
async fn each_sub_task_waits_its_duration_plus_margin() {
    let harness = Harness::new(2);
    let start = tokio::time::Instant::now();
    run_resource(&harness.ctx(), &resource(&[1, 2, 3]))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // 4s settle after login, then (minutes + 1) per sub-task.
    let expected = Duration::from_secs(4 + (2 + 3 + 4) * 60);
    assert!(elapsed >= expected, "elapsed {elapsed:?}");
    assert!(elapsed < expected + Duration::from_secs(1), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn next_chunk_opens_only_after_previous_closes() {
    let harness = Harness::new(1);
    run_resource(&harness.ctx(), &resource(&[1, 1, 1, 1]))
        .await
        .unwrap();

    for start in 0..3 {
        let closed = harness
            .log
            .position(&Event::ArtifactClosed(format!("course_{start}.webm")))
            .unwrap();
        let next_opened = harness
            .log
            .position(&Event::ArtifactOpened(format!("course_{}.webm", start + 1)))
            .unwrap();
        assert!(closed < next_opened);
    }
}

#[tokio::test(start_paused = true)]
async fn scheduler_rejects_zero_chunk_size() {
    let harness = Harness::new(2);
    let ctx = harness.ctx();
    let course = resource(&[1, 1]);

    let err = ChunkScheduler::new(&ctx, &course).run(0, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(harness.log.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn count_metric_reports_sub_task_ratio() {
    let mut harness = Harness::new(1);
    harness.config.recorder.progress_metric =
        video_recorder::models::progress::ProgressMetric::Count;
    let summary = run_resource(&harness.ctx(), &resource(&[1, 3]))
        .await
        .unwrap();

    assert!((summary.observations[0].percentage - 50.0).abs() < f64::EPSILON);
}
