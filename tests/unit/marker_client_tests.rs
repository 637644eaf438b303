use std::time::Duration;

use video_recorder::config::ServerConfig;
use video_recorder::models::resource::{Resource, SubTask};
use video_recorder::notify::HttpNotifier;
use video_recorder::persistence::marker_client::MarkerClient;
use video_recorder::persistence::CheckpointStore;
use video_recorder::AppError;

fn server(base_url: &str) -> ServerConfig {
    ServerConfig {
        base_url: base_url.into(),
        marker_endpoint: "/videos/<video-slug>/markers".into(),
        recorded_endpoint: "/videos/record".into(),
        request_timeout_seconds: 1,
    }
}

#[test]
fn marker_url_substitutes_slug() {
    let client =
        MarkerClient::new(&server("http://video-server:3000/"), Duration::from_secs(1)).unwrap();
    assert_eq!(
        client.marker_url("rust-basics"),
        "http://video-server:3000/videos/rust-basics/markers"
    );
}

fn rust_basics() -> Resource {
    let sub_task = |id: u64, slug: &str| SubTask {
        id,
        slug: slug.into(),
        name: None,
        duration_minutes: 5,
    };
    Resource {
        slug: "rust-basics".into(),
        name: "Rust Basics".into(),
        sub_tasks: vec![sub_task(11, "intro"), sub_task(12, "ownership")],
    }
}

#[test]
fn marker_names_sub_task_at_checkpoint() {
    let client = MarkerClient::new(&server("http://video-server:3000"), Duration::from_secs(1))
        .unwrap()
        .with_catalog(&[rust_basics()]);

    let marker = client.marker("rust-basics", 1);
    assert_eq!(marker.lesson_index, 1);
    assert_eq!(marker.lesson_slug.as_deref(), Some("ownership"));
    assert_eq!(
        serde_json::to_value(&marker).unwrap(),
        serde_json::json!({ "lessonIndex": 1, "lessonSlug": "ownership" })
    );
}

#[test]
fn marker_past_last_sub_task_or_unknown_resource_has_no_slug() {
    let client = MarkerClient::new(&server("http://video-server:3000"), Duration::from_secs(1))
        .unwrap()
        .with_catalog(&[rust_basics()]);

    assert_eq!(client.marker("rust-basics", 2).lesson_slug, None);
    assert_eq!(client.marker("unknown", 0).lesson_slug, None);
    assert_eq!(
        serde_json::to_value(client.marker("unknown", 0)).unwrap(),
        serde_json::json!({ "lessonIndex": 0 })
    );
}

#[test]
fn notifier_posts_to_recorded_endpoint() {
    let notifier =
        HttpNotifier::new(&server("http://video-server:3000"), Duration::from_secs(1)).unwrap();
    assert_eq!(notifier.url(), "http://video-server:3000/videos/record");
}

#[tokio::test]
async fn unreachable_server_is_unavailable_on_get() {
    // Port 9 (discard) on localhost is assumed closed.
    let client = MarkerClient::new(&server("http://127.0.0.1:9"), Duration::from_secs(1)).unwrap();
    let err = client.get("rust-basics").await.unwrap_err();
    assert!(matches!(err, AppError::CheckpointUnavailable(_)), "got {err}");
}
