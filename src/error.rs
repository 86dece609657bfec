//! Error types for the analyzer bridge.

use std::path::PathBuf;
use thiserror::Error;

/// User-facing message for any fault in the analyzer's response stream.
pub const COMMUNICATION_ERROR_MESSAGE: &str = "Communication issue with the C/C++ analyzer";

/// A deviation from the expected token/field sequence in the response stream.
#[derive(Error, Debug)]
pub enum ProtocolFault {
    #[error("stream ended while reading {field}")]
    Truncated { field: &'static str },
    #[error("expected token {expected:?}, found {found:?}")]
    UnexpectedToken { expected: &'static str, found: String },
    #[error("negative length {length} for {field}")]
    InvalidLength { field: &'static str, length: i32 },
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
    #[error("i/o error while reading {field}: {source}")]
    Io {
        field: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ProtocolFault {
    /// Map an I/O error raised while reading `field`.
    pub(crate) fn from_io(field: &'static str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolFault::Truncated { field }
        } else {
            ProtocolFault::Io { field, source: err }
        }
    }

    /// True if the stream simply ran out of bytes.
    pub fn is_truncation(&self) -> bool {
        matches!(self, ProtocolFault::Truncated { .. })
    }
}

/// Errors surfaced by the bridge to its caller.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("failed to start analyzer {}: {source}", executable.display())]
    ProcessStart {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("analyzer process i/o failed: {0}")]
    ProcessIo(#[source] std::io::Error),
    #[error("{}", COMMUNICATION_ERROR_MESSAGE)]
    Communication(#[source] ProtocolFault),
    #[error("analysis cancelled")]
    Cancelled,
    #[error("failed to write reproducer diagnostics to {}: {source}", path.display())]
    Reproducer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
