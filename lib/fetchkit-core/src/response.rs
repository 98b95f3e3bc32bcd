//! Response metadata and the outcome of a dispatch.
//!
//! The terminal handler drains the network body exactly once and returns an
//! [`Outcome`]: the response metadata (if any response was received), the
//! buffered body, and the error (if any). Interceptors read or replace any
//! of the three on the way out.

use bytes::Bytes;
use http::{HeaderMap, Version};

use crate::Error;

/// HTTP response metadata: status, headers and protocol version.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    version: Version,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap) -> Self {
        Self {
            status,
            headers,
            version: Version::HTTP_11,
        }
    }

    /// Sets the protocol version.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First header value by name, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Protocol version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

/// What a dispatch produced: response metadata, drained body and error.
///
/// Any combination is possible. A transport failure carries no response;
/// an interceptor may attach an error to a perfectly good response, or
/// clear an error by substituting its own response.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Response metadata, `None` when no response was received.
    pub response: Option<Response>,
    /// Fully drained body.
    pub body: Bytes,
    /// Error raised by the exchange or by an interceptor.
    pub error: Option<Error>,
}

impl Outcome {
    /// A successful outcome.
    #[must_use]
    pub fn new(response: Response, body: impl Into<Bytes>) -> Self {
        Self {
            response: Some(response),
            body: body.into(),
            error: None,
        }
    }

    /// An outcome carrying only an error.
    #[must_use]
    pub fn from_error(error: Error) -> Self {
        Self {
            response: None,
            body: Bytes::new(),
            error: Some(error),
        }
    }

    /// Attaches an error, keeping response and body.
    #[must_use]
    pub fn with_error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }

    /// Replaces the body, keeping response and error.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Status code of the response, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(Response::status)
    }

    /// Returns `true` if no error is attached.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Converts into a `Result`, dropping the body on error.
    pub fn into_result(self) -> crate::Result<(Response, Bytes)> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let response = self.response.ok_or(Error::NilResponse)?;
        Ok((response, self.body))
    }
}
