use anyhow::Result;
use clap::Parser;
use docrodeo::db::Db;
use docrodeo::ingest::DocumentStatus;
use docrodeo::registry::{MetadataRegistry, DEFAULT_HISTORY_LIMIT};
use docrodeo::Config;

#[derive(Parser, Debug)]
#[command(name = "history")]
#[command(about = "List recent uploads, newest first")]
struct Args {
    /// Number of uploads to show
    #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    limit: usize,

    /// Show uploads marked as removed instead of active ones
    #[arg(long)]
    removed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.rodeo.log_level.as_str()),
    )
    .init();

    if !config.registry.enabled {
        println!("Upload history is disabled (registry.enabled = false).");
        return Ok(());
    }

    let registry = MetadataRegistry::open(Db::new(config.db_path())).await?;
    let status = if args.removed {
        DocumentStatus::Removed
    } else {
        DocumentStatus::Active
    };

    let documents = registry.list_recent(status, args.limit).await?;
    if documents.is_empty() {
        println!("No {} uploads.", status);
        return Ok(());
    }

    println!("\n=== Recent uploads ({}) ===\n", status);
    println!("{:<26} {:<6} {:>12}  {}", "Uploaded", "Type", "Bytes", "Name");
    for doc in &documents {
        println!(
            "{:<26} {:<6} {:>12}  {}",
            doc.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            doc.file_type.as_str(),
            doc.size_bytes,
            doc.original_name
        );
        println!("{:<26} {}", "", doc.staged_reference);
    }
    println!();

    Ok(())
}
