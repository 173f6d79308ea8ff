//! # Observability
//!
//! Centralized logging setup for the Aarogya workspace.
//!
//! Components are **log producers** only. The host binary calls
//! `observability::init_with_config()` once at startup and every crate uses
//! the standard `tracing` macros with structured fields.
//!
//! Log lines are written as JSONL to `~/.aarogya/logs/aarogya.jsonl`
//! (or the configured path), one object per line:
//!
//! ```text
//! {"timestamp":"…","level":"INFO","service":"aarogya","pid":42,
//!  "target":"dose_sync_worker::coordinator","message":"Sync pass finished",
//!  "fields":{"synced":3,"failed":0}}
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "aarogya".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;

pub use file_sink::{default_log_path, CentralLogWriter};
pub use json_layer::LogEntry;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "aarogya", "aarogya-watch").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.aarogya/logs/aarogya.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with custom configuration.
///
/// Falls back to a compact stderr subscriber when the log file cannot be
/// opened, so a read-only home directory never prevents startup.
pub fn init_with_config(config: LogConfig) {
    if let Err(err) = file_sink::init_file_subscriber(&config) {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level)),
            )
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .finish()
            .try_init();
        tracing::warn!(error = %err, "log file unavailable, logging to stderr only");
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
