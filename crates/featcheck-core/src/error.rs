//! Error types for feature-matrix checking.

use std::path::PathBuf;

use thiserror::Error;

use crate::invocation::Invocation;

/// Errors produced while building or running a feature matrix.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// The build tool exited unsuccessfully for one subset.
    #[error(
        "[{configuration}] `{invocation}` failed (exit code {})\n{}",
        display_exit_code(.exit_code),
        String::from_utf8_lossy(.stderr)
    )]
    InvocationFailed {
        configuration: String,
        invocation: Invocation,
        exit_code: Option<i32>,
        stderr: Vec<u8>,
    },

    /// The build tool could not be started at all.
    #[error("failed to run `{invocation}`: {source}")]
    Spawn {
        invocation: Invocation,
        #[source]
        source: std::io::Error,
    },

    /// A single invocation exceeded the configured timeout.
    #[error("[{configuration}] `{invocation}` timed out after {timeout_secs} seconds")]
    TimedOut {
        configuration: String,
        invocation: Invocation,
        timeout_secs: u64,
    },

    #[error("feature '{name}' is declared more than once")]
    DuplicateFeature { name: String },

    #[error("feature names must not be empty")]
    EmptyFeatureName,

    #[error("{count} features declared, at most {max} are supported")]
    TooManyFeatures { count: usize, max: usize },

    #[error("the check matrix has no cells")]
    EmptyMatrix,

    #[error("toolchain must not be empty")]
    EmptyToolchain,

    #[error("target triple must not be empty")]
    EmptyTarget,

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A configuration task panicked or was torn down unexpectedly.
    #[error("configuration task join error: {0}")]
    TaskJoin(String),
}

impl MatrixError {
    /// The build tool call this error is about, if any.
    pub fn invocation(&self) -> Option<&Invocation> {
        match self {
            Self::InvocationFailed { invocation, .. }
            | Self::Spawn { invocation, .. }
            | Self::TimedOut { invocation, .. } => Some(invocation),
            _ => None,
        }
    }
}

fn display_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Convenience result alias.
pub type MatrixResult<T> = std::result::Result<T, MatrixError>;
