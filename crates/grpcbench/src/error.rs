//! Error types for grpcbench

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] libgrpcbench_core::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.error_code(),
            CliError::Io(_) => "io_error",
            CliError::Json(_) => "internal_error",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(e) => e.exit_code(),
            CliError::Io(_) => 5,
            CliError::Json(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
