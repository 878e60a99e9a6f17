//! Application state for the diagnosis server
//!
//! Built once at startup and shared read-only by every request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crop_diagnosis::model::DEFAULT_WEIGHTS_FILE;
use crop_diagnosis::DiagnosisService;

/// Default request body limit (16 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Trained weights loaded at startup
    pub model_path: PathBuf,
    /// Directory the report PDF is written to
    pub report_dir: PathBuf,
    /// Maximum request body size in bytes
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_path: PathBuf::from(DEFAULT_WEIGHTS_FILE),
            report_dir: PathBuf::from("."),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Loaded model and diagnosis rules
    pub service: DiagnosisService,
    /// Server configuration
    pub config: ServerConfig,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: DiagnosisService, config: ServerConfig) -> Self {
        Self {
            service,
            config,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
