//! # hookscope Utilities
//!
//! Shared utilities and logging for hookscope.
//!
//! This crate provides the logging setup used by the `hookscope` binary,
//! built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
