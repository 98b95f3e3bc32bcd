//! Request/response logging interceptor.
//!
//! Logs every exchange with the `tracing` crate: method, URL, status,
//! latency and error; at debug level also headers and (truncated) bodies.

use std::time::Instant;

use fetchkit_core::{
    BoxFuture, Context, HeaderMap, Intercept, NamedIntercept, Next, Outcome, Request,
};
use tracing::{Instrument, debug, info, info_span, warn};

/// Log level for [`LogInterceptor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (headers and bodies).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Interceptor logging requests and responses, registered as `"log"`.
///
/// # Example
///
/// ```
/// use fetchkit::{Fetch, LogInterceptor};
///
/// let fetch = Fetch::default().with_interceptor(
///     LogInterceptor::debug()
///         .exclude_header("authorization")
///         .max_request_body(256)
///         .max_response_body(1024)
///         .into(),
/// );
/// assert_eq!(fetch.chain().names().collect::<Vec<_>>(), ["log"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogInterceptor {
    level: LogLevel,
    excluded_headers: Vec<String>,
    max_request_body: Option<usize>,
    max_response_body: Option<usize>,
}

impl LogInterceptor {
    /// Log summaries at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log details at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            ..Self::default()
        }
    }

    /// Never log the request header `name`.
    #[must_use]
    pub fn exclude_header(mut self, name: &str) -> Self {
        self.excluded_headers.push(name.to_ascii_lowercase());
        self
    }

    /// Log at most `max` bytes of request bodies.
    #[must_use]
    pub const fn max_request_body(mut self, max: usize) -> Self {
        self.max_request_body = Some(max);
        self
    }

    /// Log at most `max` bytes of response bodies.
    #[must_use]
    pub const fn max_response_body(mut self, max: usize) -> Self {
        self.max_response_body = Some(max);
        self
    }

    fn visible_headers(&self, headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .filter(|(name, _)| !self.excluded_headers.iter().any(|x| x == name.as_str()))
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.to_string(), value)
            })
            .collect()
    }
}

/// Lossy text of `body`, cut after `max` bytes.
fn truncate(body: &[u8], max: Option<usize>) -> String {
    match max {
        Some(max) if body.len() > max => {
            let head = body.get(..max).unwrap_or(body);
            format!("{}...", String::from_utf8_lossy(head))
        }
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}

impl Intercept for LogInterceptor {
    fn intercept<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, Outcome> {
        let method = request.method();
        let url = request.url().to_string();
        let span = info_span!("http_request", %method, %url);

        Box::pin(
            async move {
                let detailed = self.level == LogLevel::Debug;
                if detailed {
                    debug!(
                        headers = ?self.visible_headers(request.headers()),
                        body = %request.body().map(|b| truncate(b, self.max_request_body)).unwrap_or_default(),
                        "sending request"
                    );
                } else {
                    info!("sending request");
                }

                let start = Instant::now();
                let outcome = next.run(ctx, request).await;
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                let status = outcome.status().unwrap_or_default();

                if detailed {
                    debug!(
                        status,
                        elapsed_ms,
                        body = %truncate(&outcome.body, self.max_response_body),
                        "response body"
                    );
                }

                match &outcome.error {
                    Some(error) => warn!(status, elapsed_ms, %error, "request failed"),
                    None if (200..400).contains(&status) => {
                        info!(status, elapsed_ms, "request completed");
                    }
                    None => warn!(status, elapsed_ms, "request failed with HTTP error"),
                }

                outcome
            }
            .instrument(span),
        )
    }
}

impl NamedIntercept for LogInterceptor {
    const NAME: &'static str = "log";
}
