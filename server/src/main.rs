//! Crop Diagnosis Server
//!
//! Loads the trained classifier once, then serves diagnoses and PDF reports
//! over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crop_diagnosis::backend::{backend_name, default_device, DefaultBackend};
use crop_diagnosis::model::DEFAULT_WEIGHTS_FILE;
use crop_diagnosis::utils::logging::{init_logging, LogConfig, LogLevel};
use crop_diagnosis::DiagnosisService;
use crop_diagnosis_server::state::DEFAULT_BODY_LIMIT;
use crop_diagnosis_server::{create_router, AppState, ServerConfig};

/// Crop Diagnosis Server
#[derive(Parser, Debug)]
#[command(name = "crop-diagnosis-server")]
#[command(version)]
#[command(about = "HTTP API for crop leaf disease diagnosis")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Trained model weights
    #[arg(long, env = "CROP_MODEL_PATH", default_value = DEFAULT_WEIGHTS_FILE)]
    model: PathBuf,

    /// Directory the report PDF is written to
    #[arg(long, env = "CROP_REPORT_DIR", default_value = ".")]
    report_dir: PathBuf,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT)]
    body_limit: usize,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, env = "CROP_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Plain log output without ANSI colors, for log collectors
    #[arg(long, default_value = "false")]
    plain_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.plain_logs {
        LogConfig::production()
    } else {
        LogConfig::default()
    };
    if let Some(level) = cli.log_level {
        log_config = log_config.with_level(level);
    }
    init_logging(&log_config)?;

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        model_path: cli.model,
        report_dir: cli.report_dir,
        body_limit: cli.body_limit,
    };

    info!("Crop Diagnosis Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Backend:    {}", backend_name());
    info!("  Model:      {:?}", config.model_path);
    info!("  Report dir: {:?}", config.report_dir);
    info!("  Body limit: {} bytes", config.body_limit);

    std::fs::create_dir_all(&config.report_dir)
        .with_context(|| format!("cannot create report directory {:?}", config.report_dir))?;

    // Model load failure is fatal before binding
    let service = DiagnosisService::load_burn::<DefaultBackend>(&config.model_path, default_device())
        .with_context(|| format!("failed to load model from {:?}", config.model_path))?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    // Create shared state
    let state = Arc::new(AppState::new(service, config));
    let app = create_router(state);

    // Start server
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
