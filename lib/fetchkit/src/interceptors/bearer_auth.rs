//! Bearer token authentication interceptor.
//!
//! Sets `Authorization: Bearer <token>` on every outgoing request.

use fetchkit_core::{
    BoxFuture, Context, Error, Intercept, NamedIntercept, Next, Outcome, Request, Result,
};
use http::{HeaderValue, header::AUTHORIZATION};

/// Interceptor adding a bearer token, registered as `"bearer-auth"`.
///
/// ```
/// use fetchkit::{BearerAuthInterceptor, Fetch};
///
/// let fetch = Fetch::default()
///     .with_interceptor(BearerAuthInterceptor::new("my-secret-token").unwrap().into());
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuthInterceptor {
    value: HeaderValue,
}

impl BearerAuthInterceptor {
    /// Create the interceptor for `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the token is not a valid header value.
    pub fn new(token: impl AsRef<str>) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_ref()))
            .map_err(|e| Error::invalid_request(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);
        Ok(Self { value })
    }
}

impl Intercept for BearerAuthInterceptor {
    fn intercept<'a>(
        &'a self,
        ctx: Context,
        mut request: Request,
        next: Next,
    ) -> BoxFuture<'a, Outcome> {
        request.headers_mut().insert(AUTHORIZATION, self.value.clone());
        next.run(ctx, request)
    }
}

impl NamedIntercept for BearerAuthInterceptor {
    const NAME: &'static str = "bearer-auth";
}
