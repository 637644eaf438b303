use video_recorder::artifact::{
    list_chunks, parse_chunk_file_name, ArtifactKey, ArtifactStore, FileArtifactStore,
};

#[test]
fn key_file_name_is_slug_underscore_start() {
    let key = ArtifactKey::new("rust-basics", 4, "webm");
    assert_eq!(key.file_name(), "rust-basics_4.webm");
}

#[test]
fn parses_chunk_index_from_file_name() {
    assert_eq!(parse_chunk_file_name("rust-basics_12.webm", "rust-basics", "webm"), Some(12));
    assert_eq!(parse_chunk_file_name("rust-basics_12.mp4", "rust-basics", "webm"), None);
    assert_eq!(parse_chunk_file_name("rust_basics_12.webm", "rust-basics", "webm"), None);
    assert_eq!(parse_chunk_file_name("rust-basics_x.webm", "rust-basics", "webm"), None);
    assert_eq!(parse_chunk_file_name("rust-basics-advanced_0.webm", "rust-basics", "webm"), None);
}

#[tokio::test]
async fn writer_flushes_all_bytes_on_close() {
    let temp = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(temp.path().join("videos"));
    let key = ArtifactKey::new("rust-basics", 0, "webm");

    let mut writer = store.open(&key).await.unwrap();
    writer.write(b"first ").await.unwrap();
    writer.write(b"second").await.unwrap();
    writer.close().await.unwrap();

    let path = store.path_for(&key);
    assert_eq!(std::fs::read(&path).unwrap(), b"first second");
    assert_eq!(store.locate(&key), path.display().to_string());
}

#[tokio::test]
async fn reopening_a_key_replaces_partial_artifact() {
    let temp = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(temp.path().to_path_buf());
    let key = ArtifactKey::new("rust-basics", 2, "webm");

    let mut writer = store.open(&key).await.unwrap();
    writer.write(b"partial data from a crashed run").await.unwrap();
    writer.close().await.unwrap();

    let mut writer = store.open(&key).await.unwrap();
    writer.write(b"fresh").await.unwrap();
    writer.close().await.unwrap();

    assert_eq!(std::fs::read(store.path_for(&key)).unwrap(), b"fresh");
}

#[test]
fn list_chunks_orders_numerically_and_filters() {
    let temp = tempfile::tempdir().unwrap();
    for name in [
        "rust-basics_10.webm",
        "rust-basics_2.webm",
        "rust-basics_0.webm",
        "rust-basics_4.mp4",
        "other_1.webm",
        "notes.txt",
    ] {
        std::fs::write(temp.path().join(name), b"x").unwrap();
    }

    let starts: Vec<usize> = list_chunks(temp.path(), "rust-basics", "webm")
        .unwrap()
        .into_iter()
        .map(|chunk| chunk.chunk_start)
        .collect();
    assert_eq!(starts, vec![0, 2, 10]);
}

#[test]
fn list_chunks_of_missing_dir_is_io_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = list_chunks(&temp.path().join("missing"), "x", "webm").unwrap_err();
    assert!(err.to_string().starts_with("io:"));
}
