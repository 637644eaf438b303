use std::path::Path;

use video_recorder::models::event::RecordedEvent;
use video_recorder::models::resource::Resource;

#[test]
fn event_serializes_with_camel_case_keys() {
    let resource = Resource {
        slug: "rust-basics".into(),
        name: "Rust Basics".into(),
        sub_tasks: Vec::new(),
    };
    let event = RecordedEvent::new(
        &resource,
        Path::new("/data/videos"),
        "webm",
        Path::new("/data/out"),
    );

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "title": "Rust Basics",
            "slug": "rust-basics",
            "path": "/data/videos",
            "chunkDirPath": "/data/videos",
            "extension": "webm",
            "outputPath": "/data/out",
        })
    );
}
