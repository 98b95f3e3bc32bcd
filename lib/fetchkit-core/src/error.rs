//! Error types for fetchkit.

use derive_more::{Display, Error, From};

/// Main error type for fetchkit operations.
#[derive(Debug, Clone, Display, Error, From)]
pub enum Error {
    /// The request could not be dispatched as configured
    /// (missing method, empty URL, body on a bodiless method, bad header).
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// Base URL or relative path could not be resolved.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Request body serialization failed.
    #[display("encoding error: {_0}")]
    #[from(skip)]
    Encoding(#[error(not(source))] String),

    /// Network-level failure reported by the transport.
    #[display("transport error: {_0}")]
    #[from(skip)]
    Transport(#[error(not(source))] String),

    /// The request deadline expired before the exchange completed.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The caller cancelled the request.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// A binding was requested but no response was received.
    #[display("nil response")]
    #[from(skip)]
    NilResponse,

    /// No binding is registered under this name.
    #[display("unknown binding type: {_0}")]
    #[from(skip)]
    UnknownBinding(#[error(not(source))] String),

    /// The response body could not be decoded into the target.
    #[display("decoding error at '{path}': {message}")]
    #[from(skip)]
    Decoding {
        /// Path to the offending field, empty when unknown.
        path: String,
        /// Error message.
        message: String,
    },

    /// Non-success status, raised by `error_for_status`.
    #[display("HTTP error {status}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        #[error(not(source))]
        body: bytes::Bytes,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an encoding error.
    #[must_use]
    pub fn encoding(message: impl ToString) -> Self {
        Self::Encoding(message.to_string())
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(message: impl ToString) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create an unknown binding error.
    #[must_use]
    pub fn unknown_binding(name: impl Into<String>) -> Self {
        Self::UnknownBinding(name.into())
    }

    /// Create a decoding error with path context.
    #[must_use]
    pub fn decoding(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decoding {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` for failures of the network exchange itself,
    /// including timeouts and cancellations.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout | Self::Cancelled)
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
