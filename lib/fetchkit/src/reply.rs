//! Response wrapper returned by a dispatch.

use std::sync::Arc;

use bytes::Bytes;
use fetchkit_core::{BindTarget, Bindings, Error, HeaderMap, Outcome, Response, Result};

/// The result of a dispatch: the chain's [`Outcome`] plus the binding
/// registry of the client that produced it.
///
/// Every accessor reports the outcome's error first, so a transport failure
/// is never mistaken for an empty response.
#[derive(Debug, Clone)]
pub struct Reply {
    outcome: Outcome,
    bindings: Arc<Bindings>,
}

impl Reply {
    pub(crate) fn new(outcome: Outcome, bindings: Arc<Bindings>) -> Self {
        Self { outcome, bindings }
    }

    fn check(&self) -> Result<&Response> {
        if let Some(error) = &self.outcome.error {
            return Err(error.clone());
        }
        self.outcome.response.as_ref().ok_or(Error::NilResponse)
    }

    /// Response metadata.
    pub fn response(&self) -> Result<&Response> {
        self.check()
    }

    /// Status code.
    pub fn status(&self) -> Result<u16> {
        self.check().map(Response::status)
    }

    /// Response headers.
    pub fn headers(&self) -> Result<&HeaderMap> {
        self.check().map(Response::headers)
    }

    /// Drained body.
    pub fn bytes(&self) -> Result<Bytes> {
        self.check()?;
        Ok(self.outcome.body.clone())
    }

    /// Drained body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> Result<String> {
        self.check()?;
        Ok(String::from_utf8_lossy(&self.outcome.body).into_owned())
    }

    /// Decode the body with the binding registered under `name`.
    ///
    /// # Errors
    ///
    /// In order: the outcome's error, [`Error::NilResponse`] when no
    /// response was received, [`Error::UnknownBinding`], then the
    /// binding's [`Error::Decoding`].
    pub fn bind(&self, name: &str, target: &mut dyn BindTarget) -> Result<()> {
        let response = self.check()?;
        self.bindings
            .bind(name, response, &self.outcome.body, target)
    }

    /// Same as `bind("json", target)`.
    pub fn bind_json(&self, target: &mut dyn BindTarget) -> Result<()> {
        self.bind("json", target)
    }

    /// Same as `bind("xml", target)`.
    pub fn bind_xml(&self, target: &mut dyn BindTarget) -> Result<()> {
        self.bind("xml", target)
    }

    /// Turn a non-success status into [`Error::Http`].
    pub fn error_for_status(self) -> Result<Self> {
        let status = self.status()?;
        if (200..300).contains(&status) {
            return Ok(self);
        }
        Err(Error::Http {
            status,
            body: self.outcome.body,
        })
    }

    /// The error carried by the outcome, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.outcome.error.as_ref()
    }

    /// The underlying outcome.
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Consume into the underlying outcome.
    #[must_use]
    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }
}
