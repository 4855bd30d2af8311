//! Migration orchestrator - runs extract, transform, load against the configured stores

use anyhow::{Context, Result};
use chrono::Utc;
use movies_migration::migration::load::{LoadOptions, DEFAULT_BATCH_SIZE};
use movies_migration::migration::report::MigrationReport;
use movies_migration::migration::{extract, load, transform};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Starting movie catalog migration");

    let config = Config::from_env()?;
    info!("Configuration loaded");

    match run(&config).await {
        Ok(report) => {
            info!("✓ Migration complete: {}", report);
            Ok(())
        }
        Err(e) => {
            error!("✗ Migration failed: {:#}", e);
            Err(e)
        }
    }
}

async fn run(config: &Config) -> Result<MigrationReport> {
    let started_at = Utc::now();

    // Step 1: Extract
    info!("Step 1/3: Extracting from {:?}...", config.sqlite_path);
    let source = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(extract::source_options(&config.sqlite_path))
        .await
        .with_context(|| format!("Failed to open SQLite database {:?}", config.sqlite_path))?;
    let raw = extract::extract(&source).await?;
    source.close().await;
    let source_films = raw.films.len();
    info!("✓ Extracted {} films", source_films);

    // Step 2: Transform
    info!("Step 2/3: Transforming...");
    let normalized = transform::transform(raw)?;
    info!("✓ Transformed: {}", normalized);

    if let Some(path) = &config.dump_path {
        load::dump_json(path, &normalized)?;
    }

    // Step 3: Load
    let loaded = if config.dry_run {
        warn!("Step 3/3: Skipped (dry run)");
        None
    } else {
        info!("Step 3/3: Loading into PostgreSQL...");
        let database_url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set unless DRY_RUN is enabled")?;
        let target = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        let options = LoadOptions {
            batch_size: config.batch_size.get(),
        };
        let stats = load::load(&target, &normalized, &options).await?;
        target.close().await;
        info!("✓ Load complete");
        Some(stats)
    };

    Ok(MigrationReport {
        started_at,
        finished_at: Utc::now(),
        source_films,
        loaded,
    })
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    sqlite_path: PathBuf,
    database_url: Option<String>,
    batch_size: NonZeroUsize,
    dry_run: bool,
    dump_path: Option<PathBuf>,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Config {
            sqlite_path: env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "db.sqlite".to_string())
                .into(),

            database_url: env::var("DATABASE_URL").ok(),

            batch_size: parse_batch_size(env::var("BATCH_SIZE").ok())?,

            dry_run: env::var("DRY_RUN")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),

            dump_path: env::var("DUMP_PATH").ok().map(PathBuf::from),
        })
    }
}

/// Rows per INSERT; zero is rejected rather than silently bumped to one
fn parse_batch_size(value: Option<String>) -> Result<NonZeroUsize> {
    match value {
        None => Ok(NonZeroUsize::new(DEFAULT_BATCH_SIZE).context("DEFAULT_BATCH_SIZE is zero")?),
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("BATCH_SIZE must be a positive integer, got {:?}", v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_size() {
        assert_eq!(parse_batch_size(None).unwrap().get(), DEFAULT_BATCH_SIZE);
        assert_eq!(parse_batch_size(Some("250".to_string())).unwrap().get(), 250);
        assert!(parse_batch_size(Some("0".to_string())).is_err());
        assert!(parse_batch_size(Some("-5".to_string())).is_err());
        assert!(parse_batch_size(Some("many".to_string())).is_err());
    }
}
