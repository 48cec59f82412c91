//! picta-ai - Image Analysis Service
//!
//! **Module Identity:**
//! - Name: picta-ai
//! - Port: 5000 (default)
//!
//! Accepts image uploads, computes dimensions, dominant colors and recognized objects
//! concurrently, and stores one analysis record per image.

use anyhow::{Context, Result};
use clap::Parser;
use picta_common::config::{
    default_config_path, load_toml_config, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picta_ai::config::{log_filter_directives, AnalyzerSettings};
use picta_ai::db::SqliteRecordStore;
use picta_ai::extractors::{ImageMetadataExtractor, RemoteRecognitionClient, VibrantPaletteExtractor};
use picta_ai::services::AnalysisOrchestrator;
use picta_ai::types::RecordStore;
use picta_ai::AppState;

const MODULE_NAME: &str = "picta-ai";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "picta-ai")]
#[command(about = "Image analysis service", long_about = None)]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PICTA_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "PICTA_HOST")]
    host: Option<String>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, env = "PICTA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = CompiledDefaults::for_current_platform();

    let toml_config = match args.config.clone().or_else(|| default_config_path(MODULE_NAME)) {
        Some(path) => load_toml_config(&path)?,
        None => TomlConfig::default(),
    };

    // RUST_LOG wins over the TOML level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter_directives(&toml_config.logging).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting picta-ai (Image Analysis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();

    // Step 2: Create root folder directory if missing
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let db_pool = picta_common::db::init_database_pool(&db_path).await?;
    picta_ai::db::init_tables(&db_pool).await?;
    info!("Database connection established");

    // Step 4: Analyzers and orchestrator
    let settings = AnalyzerSettings::resolve(&toml_config)?;

    let recognizer = RemoteRecognitionClient::new(settings.recognition_api_key.clone())?
        .with_endpoint(
            settings.recognition_base_url.clone(),
            settings.recognition_model_id.clone(),
        );

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db_pool));

    let orchestrator = AnalysisOrchestrator::new(
        Arc::new(ImageMetadataExtractor::new()),
        Arc::new(VibrantPaletteExtractor::new().with_sample_stride(settings.palette_sample_stride)),
        Arc::new(recognizer),
        Arc::clone(&store),
        settings.orchestrator_config(),
    );

    info!(
        threshold = settings.confidence_threshold,
        recognition_timeout_ms = settings.recognition_timeout.as_millis() as u64,
        palette_policy = ?settings.failure_policy.palette,
        recognition_policy = ?settings.failure_policy.recognition,
        max_upload_bytes = settings.max_upload_bytes,
        "Analysis pipeline configured"
    );

    let state = AppState::new(Arc::new(orchestrator), store, settings.max_upload_bytes);
    let app = picta_ai::build_router(state);

    // Step 5: Serve
    let host = args
        .host
        .or(toml_config.host.clone())
        .unwrap_or(defaults.host);
    let port = args.port.or(toml_config.port).unwrap_or(defaults.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
