use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the pipeline inspector outside of decoding.
#[derive(Error, Debug)]
pub enum InspectorError {
    /// A capture file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document (settings, last-used params) could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The endpoint string is not a usable WebSocket URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// The live socket failed to open or broke while streaming.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An error originating from the terminal / TUI layer.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reasons a delivered buffer could not be decoded into records.
///
/// Any of these discards the whole buffer.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The MessagePack byte stream is malformed or truncated.
    #[error("Malformed MessagePack at byte {offset}: {source}")]
    MsgPack {
        offset: u64,
        #[source]
        source: rmpv::decode::Error,
    },

    /// A line of a JSON-lines text message is not valid JSON.
    #[error("Malformed JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A text message is not valid UTF-8.
    #[error("Text message is not valid UTF-8: {source}")]
    Utf8 {
        #[source]
        source: std::str::Utf8Error,
    },

    /// A record is not a map carrying a string `type` field.
    #[error("Record {index} has no type discriminator")]
    MissingDiscriminator { index: usize },

    /// A record of a known type does not have the expected shape.
    #[error("Invalid {record_type} record {index}: {reason}")]
    InvalidRecord {
        record_type: String,
        index: usize,
        reason: String,
    },
}

/// Convenience alias used throughout the inspector crates.
pub type Result<T> = std::result::Result<T, InspectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = InspectorError::FileRead {
            path: PathBuf::from("/some/session.msgpack"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/session.msgpack"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_invalid_url() {
        let err = InspectorError::InvalidUrl("http://x".to_string());
        assert_eq!(err.to_string(), "Invalid endpoint URL: http://x");
    }

    #[test]
    fn test_error_display_transport() {
        let err = InspectorError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: InspectorError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: InspectorError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::MissingDiscriminator { index: 3 };
        assert_eq!(err.to_string(), "Record 3 has no type discriminator");

        let err = DecodeError::InvalidRecord {
            record_type: "frame".to_string(),
            index: 0,
            reason: "missing field `id`".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid frame record 0: missing field `id`");

        let source = std::str::from_utf8(&[0x66, 0xff]).unwrap_err();
        let err = DecodeError::Utf8 { source };
        assert!(err.to_string().starts_with("Text message is not valid UTF-8"));
    }
}
