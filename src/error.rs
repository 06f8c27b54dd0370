//! Archiver error types

use thiserror::Error;

/// Errors raised by the transport, the reassembly engine and the archiving pipeline
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// IO error during network or staging operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS error during secure connection
    #[error("TLS error: {0}")]
    Tls(String),

    /// No complete response arrived before the deadline; the connection must be re-established
    #[error("Response timeout")]
    Timeout,

    /// Another command is in flight and the wait queue is full
    #[error("Command slot busy")]
    Busy,

    /// Connection closed unexpectedly (or never opened)
    #[error("Connection closed")]
    ConnectionClosed,

    /// Status code did not match the one the operation requires
    #[error("NNTP error {code}: {message}")]
    Protocol {
        /// NNTP response code (e.g., 411, 423, 502)
        code: u16,
        /// Full status line returned by the server
        message: String,
    },

    /// Article fetch attempted without a prior successful GROUP
    #[error("No newsgroup selected")]
    NoGroupSelected,

    /// Status line or body line did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Command argument cannot be sent on the wire
    #[error("Invalid command argument: {0}")]
    InvalidArgument(String),

    /// All fragments arrived but fragment 1 carries no article identity
    #[error("Article identity missing for fragment set {0}")]
    ReassemblyIdentityMissing(String),

    /// MIME decoder could not parse the article bytes
    #[error("Decode failure: {0}")]
    Decode(String),

    /// Article store call failed
    #[error("Store failure: {0}")]
    Store(String),

    /// Staging backend could not store or read a fragment artifact
    #[error("Staging failure: {0}")]
    Staging(String),

    /// Staging record could not be (de)serialized
    #[error("Staging serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ArchiveError {
    /// True when the failure is confined to one article or group
    ///
    /// The server refused or garbled one reply, or the article itself could not be
    /// decoded or reassembled. The connection is still usable and the run goes on.
    /// Connection, store and staging failures are not skippable.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ArchiveError::Protocol { .. }
                | ArchiveError::MalformedResponse(_)
                | ArchiveError::Decode(_)
                | ArchiveError::ReassemblyIdentityMissing(_)
        )
    }
}

/// Result type alias using ArchiveError
pub type Result<T> = std::result::Result<T, ArchiveError>;
