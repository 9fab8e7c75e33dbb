//! Worker binary: consumes ingestion events from a local queue and drives
//! them through the extraction pipeline.

use tracing_subscriber::EnvFilter;

use lendingops::config::{self, Config};
use lendingops::db::sqlite::open_database;
use lendingops::pipeline::{build_engine, FsObjectStore, InMemoryQueue};
use lendingops::IngestionWorker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        version = config::APP_VERSION,
        mock_mode = config.mock_mode,
        confidence_threshold = config.confidence_threshold,
        database = %config.database_path.display(),
        "Starting {}", config::APP_NAME
    );
    for (doc_type, processor) in config.processor_map() {
        tracing::debug!(doc_type, processor, "Processor mapping");
    }

    if let Some(parent) = config.database_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(error = %e, "Failed to create data directory, exiting");
            std::process::exit(1);
        }
    }

    let conn = match open_database(&config.database_path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open database, exiting");
            std::process::exit(1);
        }
    };

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build extraction engine, exiting");
            std::process::exit(1);
        }
    };

    let store = FsObjectStore::new(config::app_data_dir().join("objects"));
    let queue = InMemoryQueue::new();

    let mut worker = IngestionWorker::new(config, conn, engine, Box::new(store));
    worker.run(&queue).await;
}
