//! Error types for header decoding and record emission.
//!
//! Every error is terminal for a run: the header stream stops after yielding one, and
//! [`drain`](crate::sink::drain) returns the first one it sees.
//!
//! # Error Categories
//!
//! - **Registry errors**: [`UnknownEntryType`]
//! - **Decode errors**: [`Decode`], [`InvalidHeader`], [`LimitExceeded`]
//! - **Output errors**: [`Serialize`], [`Write`]
//! - **Control**: [`Cancelled`]
//!
//! [`UnknownEntryType`]: Error::UnknownEntryType
//! [`Decode`]: Error::Decode
//! [`InvalidHeader`]: Error::InvalidHeader
//! [`LimitExceeded`]: Error::LimitExceeded
//! [`Serialize`]: Error::Serialize
//! [`Write`]: Error::Write
//! [`Cancelled`]: Error::Cancelled

use thiserror::Error;

/// Errors produced while turning an archive into header records.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw type code has no [`EntryType`](crate::EntryType) mapping.
    #[error("invalid type flag: {0:#04x}")]
    UnknownEntryType(u8),

    /// The archive decoder failed (malformed or truncated archive, or a read error).
    #[error("failed to decode archive entry: {0}")]
    Decode(#[source] std::io::Error),

    /// A header field could be read but not interpreted.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A decoded value exceeds the configured [`Limits`](crate::Limits).
    #[error("{what} exceeds limit: {len} > {limit}")]
    LimitExceeded {
        /// Which value was too large.
        what: &'static str,
        /// Actual length or count.
        len: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A record could not be encoded.
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The caller requested cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// Writing to the output sink failed.
    #[error("failed to write record: {0}")]
    Write(#[source] std::io::Error),
}

impl Error {
    /// Whether this error came from decoding the archive itself.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::Decode(_) | Error::InvalidHeader(_) | Error::LimitExceeded { .. }
        )
    }
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
