//! # Observability
//!
//! Centralized logging layer for the ordersdesk workspace.
//!
//! Binaries call [`init_with_config`] once at startup and use the standard
//! `tracing` macros everywhere else. Library crates never install a
//! subscriber themselves.
//!
//! Every process appends structured JSONL to a single file,
//! `~/.ordersdesk/logs/desk.jsonl` by default:
//!
//! - `tail -f ~/.ordersdesk/logs/desk.jsonl | jq` for pretty JSON
//! - `lnav ~/.ordersdesk/logs/desk.jsonl` for interactive exploration
//!
//! Field values that look like credentials (bearer strings, keys named
//! `token`, `password`, `authorization`, ...) are written as `[REDACTED]`,
//! and bearer tokens embedded in message text are masked the same way. The
//! file is created owner-only and rotated once it passes
//! [`LogConfig::max_file_bytes`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "cli".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//!
//! tracing::info!("ready");
//! ```

mod file;
mod json_layer;
mod redact;

use std::path::PathBuf;

pub use redact::{is_sensitive_key, sanitize_value, scrub_message};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.ordersdesk/logs/desk.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,

    /// Size at which the log file is rotated to `<name>.1`.
    /// 0 disables rotation.
    pub max_file_bytes: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Initialize the observability layer with default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the observability layer with custom configuration.
///
/// Falls back to a compact stderr subscriber when the JSONL file cannot be
/// opened (read-only home directory, missing `$HOME`).
pub fn init_with_config(config: LogConfig) {
    if let Err(error) = file::init_file_subscriber(&config) {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level)),
            )
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init();
        tracing::warn!(error = %error, "log file unavailable, logging to stderr only");
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
