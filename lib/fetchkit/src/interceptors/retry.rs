//! Retry interceptor.
//!
//! Reruns the rest of the chain when the exchange fails at the transport
//! level or answers with a retryable status.

use std::time::Duration;

use fetchkit_core::{BoxFuture, Context, Intercept, NamedIntercept, Next, Outcome, Request};
use tracing::debug;

/// Interceptor retrying failed exchanges, registered as `"retry"`.
///
/// By default, retries:
/// - transport errors and timeouts (not cancellations)
/// - 5xx server errors
/// - 429 Too Many Requests
///
/// Waits between attempts are cut short by the dispatch context.
#[derive(Debug, Clone)]
pub struct RetryInterceptor {
    max_retries: u32,
    interval: Duration,
    statuses: Option<Vec<u16>>,
}

impl RetryInterceptor {
    /// Retry at most `max_retries` times, 100 ms apart.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            interval: Duration::from_millis(100),
            statuses: None,
        }
    }

    /// Wait `interval` between attempts.
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Retry exactly these statuses instead of 5xx and 429.
    #[must_use]
    pub fn statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    fn should_retry(&self, outcome: &Outcome) -> bool {
        if let Some(error) = &outcome.error {
            return error.is_transport() && !error.is_cancelled();
        }
        let Some(status) = outcome.status() else {
            return false;
        };
        match &self.statuses {
            Some(statuses) => statuses.contains(&status),
            None => status >= 500 || status == 429,
        }
    }
}

impl Intercept for RetryInterceptor {
    fn intercept<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let mut attempt = 0;
            loop {
                let outcome = next.clone().run(ctx.clone(), request.clone()).await;
                if attempt >= self.max_retries || !self.should_retry(&outcome) {
                    return outcome;
                }
                if ctx.is_cancelled() || ctx.remaining().is_some_and(|left| left.is_zero()) {
                    debug!(attempt, "dispatch context expired, not retrying");
                    return outcome;
                }

                attempt += 1;
                debug!(
                    attempt,
                    max_retries = self.max_retries,
                    status = outcome.status(),
                    error = outcome.error.as_ref().map(ToString::to_string),
                    "retrying request"
                );
                if ctx.run(tokio::time::sleep(self.interval)).await.is_err() {
                    return outcome;
                }
            }
        })
    }
}

impl NamedIntercept for RetryInterceptor {
    const NAME: &'static str = "retry";
}
