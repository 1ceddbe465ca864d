//! Error types for the crate boundaries.
//!
//! The classification core is infallible: degenerate input produces default
//! feature values instead of errors. Errors only arise where the crate meets
//! the outside world: configuration files, input sources, text packets and
//! segment sinks.

use std::path::PathBuf;

/// Common result type for boundary operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Packet decoding error
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// Segment export error
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Input source error (file, stdin, socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid or unreadable pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A parameter is out of its valid range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid JSON for `PipelineConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// A text reading that could not be decoded into a sample.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PacketError {
    /// A field is present but not a number.
    #[error("field {index} is not a number: {value:?}")]
    InvalidField { index: usize, value: String },

    /// The leading timestamp field is missing or empty.
    #[error("reading has no timestamp field")]
    MissingTimestamp,
}

/// Failure while persisting or serializing segments.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write segment: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err = ConfigError::invalid("window_sec", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid value for `window_sec`: must be positive"
        );
    }

    #[test]
    fn test_conversion_into_unified_error() {
        let err: Error = PacketError::MissingTimestamp.into();
        assert!(matches!(err, Error::Packet(PacketError::MissingTimestamp)));
        assert!(err.to_string().starts_with("Packet error"));
    }
}
