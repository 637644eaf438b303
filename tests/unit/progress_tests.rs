use video_recorder::models::progress::{completion_percentage, ProgressMetric};
use video_recorder::models::resource::{Resource, SubTask};
use video_recorder::orchestrator::progress_reporter::report;

fn resource(durations: &[u32]) -> Resource {
    Resource {
        slug: "course".into(),
        name: "Course".into(),
        sub_tasks: durations
            .iter()
            .enumerate()
            .map(|(i, minutes)| SubTask {
                id: i as u64 + 100,
                slug: format!("lesson-{i}"),
                name: None,
                duration_minutes: *minutes,
            })
            .collect(),
    }
}

#[test]
fn bounds_are_zero_and_one_hundred() {
    for durations in [&[1, 1, 1, 1, 1][..], &[3, 7, 11], &[45]] {
        let r = resource(durations);
        for metric in [ProgressMetric::Duration, ProgressMetric::Count] {
            assert!((completion_percentage(&r, 0, metric) - 0.0).abs() < f64::EPSILON);
            assert!((completion_percentage(&r, r.len(), metric) - 100.0).abs() < f64::EPSILON);
        }
    }
}

#[test]
fn equal_durations_after_two_of_five() {
    let r = resource(&[1, 1, 1, 1, 1]);
    let observation = report(&r, 2, ProgressMetric::Duration);
    assert_eq!(observation.checkpoint, 2);
    assert!((observation.percentage - 40.0).abs() < f64::EPSILON);
}

#[test]
fn duration_weighting_differs_from_count() {
    let r = resource(&[1, 2]);
    assert!((completion_percentage(&r, 1, ProgressMetric::Duration) - 33.3).abs() < 1e-9);
    assert!((completion_percentage(&r, 1, ProgressMetric::Count) - 50.0).abs() < 1e-9);
}

#[test]
fn empty_resource_reports_zero() {
    let r = resource(&[]);
    assert!((completion_percentage(&r, 0, ProgressMetric::Duration)).abs() < f64::EPSILON);
    assert!((completion_percentage(&r, 0, ProgressMetric::Count)).abs() < f64::EPSILON);
}

#[test]
fn rounds_to_one_decimal_place() {
    let r = resource(&[1, 1, 1]);
    assert!((completion_percentage(&r, 1, ProgressMetric::Duration) - 33.3).abs() < 1e-9);
    assert!((completion_percentage(&r, 2, ProgressMetric::Duration) - 66.7).abs() < 1e-9);
}

#[test]
fn metric_parses_from_snake_case() {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        metric: ProgressMetric,
    }
    let parsed: Wrapper = toml::from_str(r#"metric = "count""#).unwrap();
    assert_eq!(parsed.metric, ProgressMetric::Count);
    assert_eq!(ProgressMetric::default(), ProgressMetric::Duration);
}
