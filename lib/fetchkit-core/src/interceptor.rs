//! Interceptor chain wrapping the terminal network call.
//!
//! A [`Chain`] is an ordered list of named [`Interceptor`]s. Calling it
//! with a terminal [`Handler`] runs every interceptor's pre-logic in
//! registration order, then the terminal handler, then every interceptor's
//! post-logic in reverse order:
//!
//! ```text
//! A before -> B before -> C before -> terminal -> C after -> B after -> A after
//! ```
//!
//! Each interceptor gets a [`Next`] continuation. It may rewrite the request
//! before calling it, inspect or replace the [`Outcome`] after, call it
//! several times, or not call it at all (short-circuit).
//!
//! # Example
//!
//! ```
//! use fetchkit_core::{Chain, Context, Interceptor, Method, Next, Outcome, Request, Response};
//! use http::HeaderMap;
//! use std::sync::Arc;
//!
//! # tokio_test_run(async {
//! let stamp = Interceptor::new("request-id", |ctx: Context, mut req: Request, next: Next| async move {
//!     req.headers_mut().insert("x-request-id", "42".parse().unwrap());
//!     next.run(ctx, req).await
//! })
//! .unwrap();
//!
//! let chain = Chain::new([stamp]);
//! let terminal = Arc::new(|_ctx: Context, req: Request| async move {
//!     let id = req.header("x-request-id").unwrap_or_default().to_string();
//!     Outcome::new(Response::new(200, HeaderMap::new()), id)
//! });
//!
//! let request = Request::new(Method::Get, "http://h/".parse().unwrap());
//! let outcome = chain.call(Context::new(), request, terminal).await;
//! assert_eq!(outcome.body.as_ref(), b"42");
//! # });
//! # fn tokio_test_run<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Context, Error, Outcome, Request, Result};

/// Boxed future returned by handlers and interceptors.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The innermost step of a chain: performs the actual exchange.
pub trait Handler: Send + Sync {
    /// Handle `request`.
    fn handle<'a>(&'a self, ctx: Context, request: Request) -> BoxFuture<'a, Outcome>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn handle<'a>(&'a self, ctx: Context, request: Request) -> BoxFuture<'a, Outcome> {
        Box::pin(self(ctx, request))
    }
}

/// The function part of an interceptor.
pub trait Intercept: Send + Sync {
    /// Process `request`, usually by calling `next` somewhere in between.
    fn intercept<'a>(&'a self, ctx: Context, request: Request, next: Next)
    -> BoxFuture<'a, Outcome>;
}

impl<F, Fut> Intercept for F
where
    F: Fn(Context, Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn intercept<'a>(
        &'a self,
        ctx: Context,
        request: Request,
        next: Next,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(self(ctx, request, next))
    }
}

/// An [`Intercept`] implementation with a fixed registration name.
///
/// Such types convert into an [`Interceptor`] with `.into()`. Use
/// [`Interceptor::new`] to register one under another name.
pub trait NamedIntercept: Intercept + Sized + 'static {
    /// Registration name; must not be blank.
    const NAME: &'static str;
}

impl<T: NamedIntercept> From<T> for Interceptor {
    fn from(intercept: T) -> Self {
        const { assert!(!T::NAME.is_empty(), "interceptor name must not be empty") };
        Self {
            name: Arc::from(T::NAME),
            intercept: Arc::new(intercept),
        }
    }
}

/// A named interceptor.
///
/// The name is the interceptor's identity in a [`Chain`]: registering
/// another interceptor with the same name replaces this one in place.
#[derive(Clone)]
pub struct Interceptor {
    name: Arc<str>,
    intercept: Arc<dyn Intercept>,
}

impl Interceptor {
    /// Creates a named interceptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `name` is blank.
    pub fn new(name: impl Into<String>, intercept: impl Intercept + 'static) -> Result<Self> {
        Self::from_arc(name, Arc::new(intercept))
    }

    /// Creates a named interceptor from a shared implementation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `name` is blank.
    pub fn from_arc(name: impl Into<String>, intercept: Arc<dyn Intercept>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_request("empty interceptor name"));
        }
        Ok(Self {
            name: Arc::from(name),
            intercept,
        })
    }

    /// Registration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Continuation handed to an interceptor.
///
/// Running it calls the next interceptor, or the terminal handler once no
/// interceptor is left. The position is a plain value inside `Next`, so a
/// chain can serve any number of concurrent dispatches. `Next` is cheap to
/// clone; an interceptor may run a clone more than once to retry.
#[derive(Clone)]
pub struct Next {
    interceptors: Arc<[Interceptor]>,
    index: usize,
    terminal: Arc<dyn Handler>,
}

impl Next {
    /// Continue the chain with `ctx` and `request`.
    #[must_use]
    pub fn run(self, ctx: Context, request: Request) -> BoxFuture<'static, Outcome> {
        Box::pin(async move {
            let Self {
                interceptors,
                index,
                terminal,
            } = self;

            match interceptors.get(index) {
                Some(current) => {
                    let next = Self {
                        interceptors: Arc::clone(&interceptors),
                        index: index + 1,
                        terminal,
                    };
                    current.intercept.intercept(ctx, request, next).await
                }
                None => terminal.handle(ctx, request).await,
            }
        })
    }

    /// Number of interceptors still to run before the terminal handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.interceptors.len().saturating_sub(self.index)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

/// An immutable, ordered composition of interceptors.
///
/// Changing a chain returns a new one; chains already handed to running
/// dispatches are never touched.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Arc<[Interceptor]>,
}

impl Chain {
    /// Composes `interceptors` in order. Later entries replace earlier ones
    /// with the same name, in the earlier entry's position.
    #[must_use]
    pub fn new(interceptors: impl IntoIterator<Item = Interceptor>) -> Self {
        let mut list: Vec<Interceptor> = Vec::new();
        for interceptor in interceptors {
            upsert(&mut list, interceptor);
        }
        Self {
            interceptors: list.into(),
        }
    }

    /// A chain with `interceptor` appended, or replacing the interceptor of
    /// the same name in its current position.
    #[must_use]
    pub fn with(&self, interceptor: Interceptor) -> Self {
        let mut list = self.interceptors.to_vec();
        upsert(&mut list, interceptor);
        Self {
            interceptors: list.into(),
        }
    }

    /// A chain without the interceptor named `name`.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        Self {
            interceptors: self
                .interceptors
                .iter()
                .filter(|i| i.name() != name)
                .cloned()
                .collect(),
        }
    }

    /// Interceptor names in call order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.interceptors.iter().map(Interceptor::name)
    }

    /// Number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if the chain has no interceptor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs `request` through every interceptor and then `terminal`.
    ///
    /// With no interceptor this is exactly `terminal.handle(ctx, request)`.
    #[must_use]
    pub fn call(
        &self,
        ctx: Context,
        request: Request,
        terminal: Arc<dyn Handler>,
    ) -> BoxFuture<'static, Outcome> {
        Next {
            interceptors: Arc::clone(&self.interceptors),
            index: 0,
            terminal,
        }
        .run(ctx, request)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn upsert(list: &mut Vec<Interceptor>, interceptor: Interceptor) {
    match list.iter_mut().find(|i| i.name == interceptor.name) {
        Some(existing) => existing.intercept = interceptor.intercept,
        None => list.push(interceptor),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::HeaderMap;

    use super::*;
    use crate::{Method, Response};

    type Trace = Arc<Mutex<Vec<String>>>;

    fn request(path: &str) -> Request {
        let url = url::Url::parse("http://h/")
            .and_then(|base| base.join(path))
            .expect("valid URL");
        Request::new(Method::Get, url)
    }

    fn record(trace: &Trace, entry: impl Into<String>) {
        trace.lock().expect("trace lock").push(entry.into());
    }

    fn entries(trace: &Trace) -> Vec<String> {
        trace.lock().expect("trace lock").clone()
    }

    fn tracing_interceptor(name: &'static str, trace: &Trace) -> Interceptor {
        let trace = Arc::clone(trace);
        Interceptor::new(name, move |ctx: Context, req: Request, next: Next| {
            let trace = Arc::clone(&trace);
            async move {
                record(&trace, format!("{name}-before"));
                let outcome = next.run(ctx, req).await;
                record(&trace, format!("{name}-after"));
                outcome
            }
        })
        .expect("valid name")
    }

    fn terminal(trace: &Trace) -> Arc<dyn Handler> {
        let trace = Arc::clone(trace);
        Arc::new(move |_ctx: Context, req: Request| {
            let trace = Arc::clone(&trace);
            async move {
                record(&trace, "T");
                Outcome::new(Response::new(200, HeaderMap::new()), req.url().path().to_string())
            }
        })
    }

    #[tokio::test]
    async fn runs_in_onion_order() {
        let trace = Trace::default();
        let chain = Chain::new([
            tracing_interceptor("A", &trace),
            tracing_interceptor("B", &trace),
            tracing_interceptor("C", &trace),
        ]);

        for _ in 0..2 {
            trace.lock().expect("trace lock").clear();
            let outcome = chain
                .call(Context::new(), request("x"), terminal(&trace))
                .await;
            assert!(outcome.is_ok());
            assert_eq!(
                entries(&trace),
                [
                    "A-before", "B-before", "C-before", "T", "C-after", "B-after", "A-after"
                ]
            );
        }
    }

    #[tokio::test]
    async fn empty_chain_is_identity() {
        let trace = Trace::default();
        let chain = Chain::default();
        assert!(chain.is_empty());

        let through_chain = chain
            .call(Context::new(), request("users/1"), terminal(&trace))
            .await;
        let direct = terminal(&trace)
            .handle(Context::new(), request("users/1"))
            .await;

        assert_eq!(through_chain.body, direct.body);
        assert_eq!(through_chain.status(), direct.status());
        assert_eq!(entries(&trace), ["T", "T"]);
    }

    #[tokio::test]
    async fn single_interceptor_wraps_terminal() {
        let trace = Trace::default();
        let chain = Chain::new([tracing_interceptor("only", &trace)]);
        chain
            .call(Context::new(), request("x"), terminal(&trace))
            .await;
        assert_eq!(entries(&trace), ["only-before", "T", "only-after"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_links() {
        let trace = Trace::default();
        let blocker = {
            let trace = Arc::clone(&trace);
            Interceptor::new("block", move |_ctx: Context, _req: Request, _next: Next| {
                let trace = Arc::clone(&trace);
                async move {
                    record(&trace, "block");
                    Outcome::new(Response::new(403, HeaderMap::new()), "blocked")
                }
            })
            .expect("valid name")
        };

        let chain = Chain::new([
            tracing_interceptor("A", &trace),
            blocker,
            tracing_interceptor("C", &trace),
        ]);
        let outcome = chain
            .call(Context::new(), request("x"), terminal(&trace))
            .await;

        assert_eq!(entries(&trace), ["A-before", "block", "A-after"]);
        assert_eq!(outcome.status(), Some(403));
        assert_eq!(outcome.body.as_ref(), b"blocked");
    }

    #[tokio::test]
    async fn body_is_replayable_across_links() {
        let seen: Arc<Mutex<Vec<Bytes>>> = Arc::default();
        let reader = |name: &'static str| {
            let seen = Arc::clone(&seen);
            Interceptor::new(name, move |ctx: Context, req: Request, next: Next| {
                let seen = Arc::clone(&seen);
                async move {
                    let outcome = next.run(ctx, req).await;
                    seen.lock().expect("lock").push(outcome.body.clone());
                    outcome
                }
            })
            .expect("valid name")
        };

        let chain = Chain::new([reader("outer"), reader("inner")]);
        let outcome = chain
            .call(Context::new(), request("payload"), terminal(&Trace::default()))
            .await;

        let seen = seen.lock().expect("lock").clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|body| body == &outcome.body));
        assert_eq!(outcome.body.as_ref(), b"/payload");
    }

    #[tokio::test]
    async fn inner_link_can_replace_body() {
        let upper = Interceptor::new("upper", |ctx: Context, req: Request, next: Next| async move {
            let outcome = next.run(ctx, req).await;
            let body = outcome.body.to_ascii_uppercase();
            outcome.with_body(body)
        })
        .expect("valid name");

        let outcome = Chain::new([upper])
            .call(Context::new(), request("abc"), terminal(&Trace::default()))
            .await;
        assert_eq!(outcome.body.as_ref(), b"/ABC");
    }

    #[tokio::test]
    async fn errors_reach_outer_links() {
        let trace = Trace::default();
        let failing: Arc<dyn Handler> = Arc::new(|_ctx: Context, _req: Request| async {
            Outcome::from_error(Error::transport("connection refused"))
        });

        let observer = {
            let trace = Arc::clone(&trace);
            Interceptor::new("observer", move |ctx: Context, req: Request, next: Next| {
                let trace = Arc::clone(&trace);
                async move {
                    let outcome = next.run(ctx, req).await;
                    if let Some(error) = &outcome.error {
                        record(&trace, format!("saw {error}"));
                    }
                    outcome
                }
            })
            .expect("valid name")
        };

        let outcome = Chain::new([observer, tracing_interceptor("inner", &trace)])
            .call(Context::new(), request("x"), failing)
            .await;

        assert!(outcome.response.is_none());
        assert!(outcome.error.as_ref().is_some_and(Error::is_transport));
        assert_eq!(
            entries(&trace),
            [
                "inner-before",
                "inner-after",
                "saw transport error: connection refused"
            ]
        );
    }

    #[tokio::test]
    async fn interceptor_can_substitute_success() {
        let failing: Arc<dyn Handler> =
            Arc::new(|_ctx: Context, _req: Request| async { Outcome::from_error(Error::Timeout) });

        let fallback = Interceptor::new("fallback", |ctx: Context, req: Request, next: Next| async move {
            let outcome = next.run(ctx, req).await;
            if outcome.error.is_some() {
                return Outcome::new(Response::new(200, HeaderMap::new()), "cached");
            }
            outcome
        })
        .expect("valid name");

        let outcome = Chain::new([fallback])
            .call(Context::new(), request("x"), failing)
            .await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.body.as_ref(), b"cached");
    }

    #[tokio::test]
    async fn next_can_be_run_twice() {
        let trace = Trace::default();
        let twice = Interceptor::new("twice", |ctx: Context, req: Request, next: Next| async move {
            let first = next.clone().run(ctx.clone(), req.clone()).await;
            assert!(first.is_ok());
            next.run(ctx, req).await
        })
        .expect("valid name");

        Chain::new([twice, tracing_interceptor("inner", &trace)])
            .call(Context::new(), request("x"), terminal(&trace))
            .await;

        assert_eq!(
            entries(&trace),
            ["inner-before", "T", "inner-after", "inner-before", "T", "inner-after"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_dispatches_do_not_interfere() {
        let slow_echo = Interceptor::new("echo", |ctx: Context, req: Request, next: Next| async move {
            let path = req.url().path().to_string();
            tokio::task::yield_now().await;
            let outcome = next.run(ctx, req).await;
            assert_eq!(outcome.body.as_ref(), path.as_bytes());
            outcome
        })
        .expect("valid name");
        let chain = Chain::new([slow_echo.clone(), slow_echo.clone().renamed("echo-2")]);

        let mut handles = Vec::new();
        for i in 0..16 {
            let chain = chain.clone();
            handles.push(tokio::spawn(async move {
                chain
                    .call(
                        Context::new(),
                        request(&format!("item/{i}")),
                        terminal(&Trace::default()),
                    )
                    .await
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let outcome = handle.await.expect("task");
            assert_eq!(outcome.body, Bytes::from(format!("/item/{i}")));
        }
    }

    #[test]
    fn same_name_replaces_in_place() {
        let trace = Trace::default();
        let chain = Chain::new([
            tracing_interceptor("a", &trace),
            tracing_interceptor("b", &trace),
            tracing_interceptor("c", &trace),
        ]);

        let replaced = chain.with(tracing_interceptor("b", &trace));
        assert_eq!(replaced.names().collect::<Vec<_>>(), ["a", "b", "c"]);

        let appended = replaced.with(tracing_interceptor("d", &trace));
        assert_eq!(appended.names().collect::<Vec<_>>(), ["a", "b", "c", "d"]);
        assert_eq!(chain.len(), 3);

        let removed = appended.without("a");
        assert_eq!(format!("{removed:?}"), r#"["b", "c", "d"]"#);
    }

    #[tokio::test]
    async fn replacement_changes_behavior_not_position() {
        let trace = Trace::default();
        let chain = Chain::new([
            tracing_interceptor("a", &trace),
            tracing_interceptor("b", &trace),
        ]);
        let quiet = Interceptor::new("a", |ctx: Context, req: Request, next: Next| next.run(ctx, req))
            .expect("valid name");
        let chain = chain.with(quiet);

        chain
            .call(Context::new(), request("x"), terminal(&trace))
            .await;
        assert_eq!(entries(&trace), ["b-before", "T", "b-after"]);
    }

    #[tokio::test]
    async fn named_intercept_converts() {
        struct Teapot;

        impl Intercept for Teapot {
            fn intercept<'a>(&'a self, _: Context, _: Request, _: Next) -> BoxFuture<'a, Outcome> {
                Box::pin(async { Outcome::new(Response::new(418, HeaderMap::new()), "") })
            }
        }

        impl NamedIntercept for Teapot {
            const NAME: &'static str = "teapot";
        }

        let chain = Chain::new([Teapot.into()]);
        assert_eq!(chain.names().collect::<Vec<_>>(), ["teapot"]);

        let outcome = chain
            .call(Context::new(), request("x"), terminal(&Trace::default()))
            .await;
        assert_eq!(outcome.status(), Some(418));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Interceptor::new("  ", |ctx: Context, req: Request, next: Next| next.run(ctx, req))
            .expect_err("blank name");
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    impl Interceptor {
        fn renamed(mut self, name: &str) -> Self {
            self.name = Arc::from(name);
            self
        }
    }
}
