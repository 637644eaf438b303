#![forbid(unsafe_code)]

//! `video-recorder-ctl` — operator companion for `video-recorder`.
//!
//! Inspects and edits the stored checkpoint of a resource and lists the
//! chunk artifacts already on disk. `checkpoints` lists every resource
//! tracked by the local `SQLite` store. Uses the same configuration file and
//! checkpoint backend as the recorder.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use video_recorder::artifact::list_chunks;
use video_recorder::config::GlobalConfig;
use video_recorder::models::checkpoint;
use video_recorder::models::chunk::partition;
use video_recorder::models::progress::completion_percentage;
use video_recorder::models::resource::{Resource, SubTask};
use video_recorder::persistence::{open_repo, open_store, CheckpointStore};
use video_recorder::{AppError, Result};

#[derive(Debug, Parser)]
#[command(
    name = "video-recorder-ctl",
    about = "Checkpoint and artifact inspection for video-recorder",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Resource slug; defaults to `resource` in the config file.
    #[arg(long)]
    resource: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the stored checkpoint and completion percentage.
    Status,

    /// Show the chunks the next run would record.
    Plan,

    /// Overwrite the stored checkpoint.
    Set {
        /// Number of completed sub-tasks.
        index: u64,
    },

    /// Delete the stored checkpoint so the next run starts from the beginning.
    Reset,

    /// List recorded chunk files in merge order.
    Chunks,

    /// List every checkpoint in the local `SQLite` store with its last write time.
    Checkpoints,
}

fn main() {
    let args = Cli::parse();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> Result<()> {
    let config = GlobalConfig::load_from_path(&args.config)?;
    let resource = config.select_resource(args.resource.as_deref())?;

    match args.command {
        Command::Status => {
            let store = open_store(&config).await?;
            let index = stored_checkpoint(store.as_ref(), resource).await?;
            let percentage =
                completion_percentage(resource, index, config.recorder.progress_metric);
            println!(
                "{}: {index}/{} sub-tasks recorded ({percentage:.1}%)",
                resource.slug,
                resource.len()
            );
        }
        Command::Plan => {
            let store = open_store(&config).await?;
            let index = stored_checkpoint(store.as_ref(), resource).await?;
            let chunks = partition(resource.len(), index, config.recorder.chunk_size)?;
            if chunks.is_empty() {
                println!("{}: nothing left to record", resource.slug);
            }
            for chunk in chunks {
                let names: Vec<&str> = chunk
                    .sub_tasks(resource)
                    .iter()
                    .map(SubTask::display_name)
                    .collect();
                println!("[{}, {}) {}", chunk.start, chunk.end, names.join(", "));
            }
        }
        Command::Set { index } => {
            let index = checkpoint::validate(resource, index)?;
            let store = open_store(&config).await?;
            store.set(&resource.slug, index as u64).await?;
            println!("{}: checkpoint set to {index}", resource.slug);
        }
        Command::Reset => {
            let store = open_store(&config).await?;
            store.delete(&resource.slug).await?;
            println!("{}: checkpoint cleared", resource.slug);
        }
        Command::Chunks => {
            for chunk in list_chunks(&config.video_dir_path, &resource.slug, &config.extension)? {
                println!("{}\t{}", chunk.chunk_start, chunk.path.display());
            }
        }
        Command::Checkpoints => {
            let records = open_repo(&config).await?.list().await?;
            if records.is_empty() {
                println!("no checkpoints stored");
            }
            for record in records {
                println!(
                    "{}\t{}\t{}",
                    record.resource_slug,
                    record.sub_task_index,
                    record.updated_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}

async fn stored_checkpoint(store: &dyn CheckpointStore, resource: &Resource) -> Result<usize> {
    let stored = store.get(&resource.slug).await?.unwrap_or(0);
    checkpoint::validate(resource, stored)
}
