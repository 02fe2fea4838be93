use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docrodeo::app::App;
use docrodeo::db::{migrate, Db};
use docrodeo::error::RodeoError;
use docrodeo::{server, Config};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "docrodeo")]
#[command(about = "Upload a document, extract its text, ask questions about it", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Check configuration and the upload history schema, then exit
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // RUST_LOG wins over rodeo.log_level
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.rodeo.log_level.as_str()),
    )
    .init();

    log::info!("Starting Document Rodeo v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Verify => run_verification(config).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    let app = App::from_config(&config).await?;

    server::run(
        Arc::new(app),
        config.http_server.port,
        config.http_server.max_upload_bytes,
        &config.http_server.allowed_origins,
    )
    .await?;

    Ok(())
}

async fn run_verification(config: Config) -> Result<()> {
    log::info!("Configuration loaded successfully");
    log::info!("Stage: {} ({})", config.stage_dir().display(), config.stage_path());
    log::info!("Extraction mode: {:?}", config.extraction.mode);
    log::info!("Completion model: {}", config.completion.model);

    if !config.registry.enabled {
        log::info!("Upload history disabled, nothing to verify");
        return Ok(());
    }

    log::info!("Database path: {}", config.db_path().display());
    let db = Db::new(config.db_path());
    db.with_connection(|conn| migrate::run_migrations(conn))
        .await
        .context("Failed to run migrations")?;

    verify_database_schema(&db).await?;
    log::info!("Upload history schema is up to date");

    Ok(())
}

/// Check that the registry table and its history index exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        let exists = |kind: &str, name: &str| -> docrodeo::Result<bool> {
            let mut stmt = conn.prepare("SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2")?;
            Ok(stmt.exists([kind, name])?)
        };

        for table in ["uploaded_documents", "schema_migrations"] {
            if !exists("table", table)? {
                log::error!("Missing table: {}", table);
                return Err(RodeoError::Config(format!("Missing table {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        if !exists("index", "idx_uploaded_documents_status_time")? {
            return Err(RodeoError::Config(
                "Missing index idx_uploaded_documents_status_time".to_string(),
            ));
        }
        log::debug!("✓ History index exists");

        let applied: i64 = conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))?;
        log::info!(
            "{} of {} migrations applied",
            applied,
            migrate::known_migrations()
        );

        Ok(())
    })
    .await?;

    Ok(())
}
