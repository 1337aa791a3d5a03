use std::path::PathBuf;

use thiserror::Error;

/// Main error type for run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("call required")]
    CallRequired,

    #[error("host required")]
    HostRequired,

    #[error("must provide proto or protoset")]
    SourceRequired,

    #[error("must provide either proto or protoset, not both")]
    ConflictingSources,

    #[error("proto: must have .proto extension: '{0}'")]
    ProtoExtension(String),

    #[error("invalid duration '{value}': {source}")]
    Duration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid settings file {}: {message}", .path.display())]
    Settings { path: PathBuf, message: String },

    #[error("{context} {}: {source}", .path.display())]
    File {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Stream {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Stable error code for machine-readable output
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::CallRequired
            | ConfigError::HostRequired
            | ConfigError::SourceRequired
            | ConfigError::ConflictingSources => "required_field",
            ConfigError::ProtoExtension(_)
            | ConfigError::Duration { .. }
            | ConfigError::Settings { .. } => "invalid_format",
            ConfigError::File { .. } | ConfigError::Stream { .. } => "io_error",
            ConfigError::Json(_) => "serialization_error",
        }
    }

    /// Exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self.error_code() {
            "required_field" | "invalid_format" => 2,
            "io_error" => 5,
            _ => 1,
        }
    }

    /// Wrap a file read failure with the operation that attempted it
    pub(crate) fn file(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ConfigError::File {
            context,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_codes() {
        for err in [
            ConfigError::CallRequired,
            ConfigError::HostRequired,
            ConfigError::SourceRequired,
            ConfigError::ConflictingSources,
        ] {
            assert_eq!(err.error_code(), "required_field");
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn test_file_error_names_path_and_context() {
        let err = ConfigError::file(
            "read binary data",
            "/no/such/file.bin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("read binary data"));
        assert!(msg.contains("/no/such/file.bin"));
        assert_eq!(err.error_code(), "io_error");
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_messages() {
        assert_eq!(ConfigError::CallRequired.to_string(), "call required");
        assert_eq!(ConfigError::HostRequired.to_string(), "host required");
        assert_eq!(
            ConfigError::SourceRequired.to_string(),
            "must provide proto or protoset"
        );
    }
}
