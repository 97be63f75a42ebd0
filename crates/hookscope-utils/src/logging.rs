//! # Logging Utilities
//!
//! Logging infrastructure for hookscope using `tracing`.
//!
//! The engine logs resolution and traversal steps at `debug`/`trace` and
//! remediation hints at `warn`/`error`. Console output goes to stderr so it
//! never mixes with inspection results printed on stdout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hookscope_utils::init_logging;
//!
//! // Initialize with default settings (reads from RUST_LOG env var)
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=hookscope_core=trace`)
//! - `HOOKSCOPE_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `HOOKSCOPE_LOG_FILE`: Optional log file path, or a directory to receive
//!   `YYYY-MM-DD-hookscope.log` (if not set, logs only to stderr)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "HOOKSCOPE_LOG_FORMAT";
const FILE_VAR: &str = "HOOKSCOPE_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format
    #[default]
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Keeps the background file writer alive
///
/// Dropping it flushes buffered file output. Hold it for the life of the
/// program; console-only logging returns a guard with nothing inside.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `hookscope_core=trace`)
/// - `HOOKSCOPE_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `HOOKSCOPE_LOG_FILE`: Optional path to log file or log directory
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the log directory
/// cannot be created.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = env::var(FORMAT_VAR)
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or_default();

    // RUST_LOG may also hold module filters, which EnvFilter picks up below
    let default_level = env::var("RUST_LOG")
        .unwrap_or_else(|_| "warn".to_string())
        .parse::<LogLevel>()
        .map(Into::into)
        .unwrap_or(Level::WARN);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    init_logging_internal(format, filter)
}

/// Initialize logging with explicit level and format
///
/// An explicit level (the `--log-level` flag) takes precedence over `RUST_LOG`.
///
/// ## Example
///
/// ```rust,no_run
/// use hookscope_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, EnvFilter::new(Level::from(level).to_string()))
}

/// Where file output goes, if anywhere
///
/// A directory gets a date-prefixed file; anything else is used as given.
fn log_file_target() -> Option<(PathBuf, String)>
{
    let path = PathBuf::from(env::var_os(FILE_VAR)?);
    if path.is_dir() {
        let today = Utc::now().format("%Y-%m-%d");
        return Some((path, format!("{today}-hookscope.log")));
    }
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let name = path.file_name()?.to_string_lossy().into_owned();
    Some((dir, name))
}

fn init_logging_internal(format: LogFormat, filter: EnvFilter) -> Result<LoggingGuard, LoggingError>
{
    let file = match log_file_target() {
        Some((dir, name)) => {
            std::fs::create_dir_all(&dir)?;
            Some(tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name)))
        }
        None => None,
    };

    let mut guard = LoggingGuard::default();
    let result = match format {
        LogFormat::Pretty => {
            let console_layer = fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_writer(io::stderr)
                .with_filter(filter.clone());

            let file_layer = file.map(|(writer, worker)| {
                guard._file = Some(worker);
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false) // No ANSI in files
                    .with_filter(filter)
            });

            Registry::default().with(console_layer).with(file_layer).try_init()
        }
        LogFormat::Json => {
            let console_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(io::stderr)
                .with_filter(filter.clone());

            let file_layer = file.map(|(writer, worker)| {
                guard._file = Some(worker);
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_filter(filter)
            });

            Registry::default().with(console_layer).with(file_layer).try_init()
        }
    };

    result.map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
