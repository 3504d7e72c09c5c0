// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the daemon
//!
//! External command failures (`ExecError`) are handled at the monitor
//! controller boundary and never cross it; `AppError` covers the failures
//! that can end the process.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single external ddcutil invocation
#[derive(Error, Debug)]
pub enum ExecError {
    /// The utility could not be spawned or its output could not be collected
    #[error("failed to run `{command}`: {source}")]
    Execution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The child ran past its allotted time and was killed
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// No input device matched, and fallback was disabled or impossible
    #[error("no usable key input device found")]
    DeviceNotFound,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;
