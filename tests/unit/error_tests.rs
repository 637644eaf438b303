use video_recorder::AppError;

#[test]
fn display_uses_category_prefix() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::SessionEstablishment("bad".into()), "session establishment: bad"),
        (AppError::Session("bad".into()), "session: bad"),
        (AppError::Capture("bad".into()), "capture: bad"),
        (AppError::CheckpointUnavailable("bad".into()), "checkpoint store unavailable: bad"),
        (AppError::Checkpoint("bad".into()), "checkpoint: bad"),
        (AppError::Notify("bad".into()), "notify: bad"),
        (AppError::Io("bad".into()), "io: bad"),
        (AppError::Db("bad".into()), "db: bad"),
        (AppError::Http("bad".into()), "http: bad"),
        (AppError::Protocol("bad".into()), "protocol: bad"),
        (AppError::InvalidState("bad".into()), "invalid state: bad"),
        (AppError::Cancelled, "cancelled"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn establishment_and_unavailable_store_are_fatal() {
    assert!(AppError::SessionEstablishment("x".into()).is_fatal());
    assert!(AppError::CheckpointUnavailable("x".into()).is_fatal());
    assert!(AppError::Cancelled.is_fatal());
}

#[test]
fn step_local_failures_are_not_fatal() {
    assert!(!AppError::Notify("x".into()).is_fatal());
    assert!(!AppError::Session("x".into()).is_fatal());
    assert!(!AppError::Http("x".into()).is_fatal());
}

#[test]
fn capture_and_artifact_failures_are_fatal() {
    assert!(AppError::Capture("x".into()).is_fatal());
    assert!(AppError::Io("x".into()).is_fatal());
    assert!(AppError::InvalidState("x".into()).is_fatal());
}

#[test]
fn io_error_converts_to_io_variant() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(err.to_string(), "io: gone");
}

#[test]
fn toml_error_converts_to_config_variant() {
    let parse: Result<toml::Value, _> = toml::from_str("key = ");
    let err: AppError = parse.unwrap_err().into();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn implements_std_error() {
    fn assert_error<E: std::error::Error>(_: &E) {}
    assert_error(&AppError::Cancelled);
}
