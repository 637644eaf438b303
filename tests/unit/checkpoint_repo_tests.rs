use std::sync::Arc;

use video_recorder::config::GlobalConfig;
use video_recorder::persistence::checkpoint_repo::CheckpointRepo;
use video_recorder::persistence::{db, open_repo, open_store, CheckpointStore};
use video_recorder::AppError;

async fn repo() -> CheckpointRepo {
    let pool = db::connect_memory().await.expect("memory db");
    CheckpointRepo::new(Arc::new(pool))
}

#[tokio::test]
async fn absent_key_reads_as_none() {
    let repo = repo().await;
    assert_eq!(repo.get("rust-basics").await.unwrap(), None);
}

#[tokio::test]
async fn set_then_get_returns_latest_value() {
    let repo = repo().await;
    repo.set("rust-basics", 2).await.unwrap();
    repo.set("rust-basics", 4).await.unwrap();
    assert_eq!(repo.get("rust-basics").await.unwrap(), Some(4));

    let record = repo.get_record("rust-basics").await.unwrap().unwrap();
    assert_eq!(record.sub_task_index, 4);
}

#[tokio::test]
async fn delete_removes_only_that_key() {
    let repo = repo().await;
    repo.set("a", 1).await.unwrap();
    repo.set("b", 2).await.unwrap();
    repo.delete("a").await.unwrap();
    repo.delete("missing").await.unwrap();

    assert_eq!(repo.get("a").await.unwrap(), None);
    assert_eq!(repo.get("b").await.unwrap(), Some(2));
}

#[tokio::test]
async fn list_is_ordered_by_slug() {
    let repo = repo().await;
    repo.upsert("zeta", 1).await.unwrap();
    repo.upsert("alpha", 3).await.unwrap();

    let slugs: Vec<String> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.resource_slug)
        .collect();
    assert_eq!(slugs, vec!["alpha", "zeta"]);
}

#[tokio::test]
async fn file_database_survives_reconnect() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state").join("checkpoints.db");

    {
        let pool = db::connect(&path).await.unwrap();
        CheckpointRepo::new(Arc::new(pool)).set("rust-basics", 3).await.unwrap();
    }

    let pool = db::connect(&path).await.unwrap();
    let repo = CheckpointRepo::new(Arc::new(pool));
    assert_eq!(repo.get("rust-basics").await.unwrap(), Some(3));
}

fn config_with_checkpoint(section: &str) -> GlobalConfig {
    let toml = format!(
        r#"
video_dir_path = "/tmp/videos"
output_path = "/tmp/output"

[session]
login_url = "https://school.test/sign_in"
lesson_url = "https://school.test/<lesson-slug>"
helper_cli = "node"

[capture]
command = "ffmpeg"

[server]
base_url = "http://localhost:3000"

{section}

[[resources]]
slug = "rust-basics"
name = "Rust Basics"

[[resources.sub_tasks]]
id = 1
slug = "intro"
duration_minutes = 1
"#
    );
    GlobalConfig::from_toml_str(&toml).expect("config parses")
}

#[tokio::test]
async fn repo_lists_what_the_recorder_store_wrote() {
    let temp = tempfile::tempdir().unwrap();
    let db_path = temp.path().join("checkpoints.db");
    let config = config_with_checkpoint(&format!(
        "[checkpoint]\nbackend = \"sqlite\"\ndb_path = '{}'",
        db_path.display()
    ));

    open_store(&config).await.unwrap().set("rust-basics", 1).await.unwrap();

    let records = open_repo(&config).await.unwrap().list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resource_slug, "rust-basics");
    assert_eq!(records[0].sub_task_index, 1);
}

#[tokio::test]
async fn repo_requires_db_path() {
    let config = config_with_checkpoint("");
    let err = open_repo(&config).await.err().expect("no db_path configured");
    assert!(matches!(err, AppError::Config(_)), "got {err}");
}
