use video_recorder::models::checkpoint::{validate, CheckpointMarker};
use video_recorder::models::resource::{Resource, SubTask};
use video_recorder::AppError;

fn resource(len: usize) -> Resource {
    Resource {
        slug: "course".into(),
        name: "Course".into(),
        sub_tasks: (0..len)
            .map(|i| SubTask {
                id: i as u64,
                slug: format!("lesson-{i}"),
                name: None,
                duration_minutes: 1,
            })
            .collect(),
    }
}

#[test]
fn stored_value_within_bounds_is_accepted() {
    let r = resource(5);
    assert_eq!(validate(&r, 0).unwrap(), 0);
    assert_eq!(validate(&r, 3).unwrap(), 3);
    assert_eq!(validate(&r, 5).unwrap(), 5);
}

#[test]
fn stored_value_past_end_is_rejected() {
    let err = validate(&resource(5), 6).unwrap_err();
    assert!(matches!(err, AppError::Checkpoint(_)));
    assert!(err.to_string().contains("exceeds sub-task count 5"));
}

#[test]
fn marker_uses_camel_case_fields() {
    let marker = CheckpointMarker {
        lesson_index: 4,
        lesson_slug: Some("closures".into()),
    };
    let json = serde_json::to_value(&marker).unwrap();
    assert_eq!(json, serde_json::json!({ "lessonIndex": 4, "lessonSlug": "closures" }));
}

#[test]
fn marker_omits_absent_slug() {
    let marker = CheckpointMarker {
        lesson_index: 2,
        lesson_slug: None,
    };
    assert_eq!(serde_json::to_string(&marker).unwrap(), r#"{"lessonIndex":2}"#);

    let parsed: CheckpointMarker = serde_json::from_str(r#"{"lessonIndex":7}"#).unwrap();
    assert_eq!(parsed.lesson_index, 7);
    assert_eq!(parsed.lesson_slug, None);
}
