//! Basic authentication interceptor.
//!
//! Sets `Authorization: Basic <base64(user:pass)>` on every outgoing request.

use base64::Engine;
use fetchkit_core::{
    BoxFuture, Context, Error, Intercept, NamedIntercept, Next, Outcome, Request, Result,
};
use http::{HeaderValue, header::AUTHORIZATION};

/// Interceptor adding basic credentials, registered as `"basic-auth"`.
#[derive(Debug, Clone)]
pub struct BasicAuthInterceptor {
    value: HeaderValue,
}

impl BasicAuthInterceptor {
    /// Create the interceptor for `username` and `password`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the encoded header is invalid.
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Result<Self> {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        value.set_sensitive(true);
        Ok(Self { value })
    }
}

impl Intercept for BasicAuthInterceptor {
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

impl NamedIntercept for BasicAuthInterceptor {
    const NAME: &'static str = "basic-auth";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_correctly() {
        // "user:pass" -> "dXNlcjpwYXNz"
        let auth = BasicAuthInterceptor::new("user", "pass").expect("valid");
        assert_eq!(auth.value, "Basic dXNlcjpwYXNz");
        assert!(auth.value.is_sensitive());
    }
}
