//! Fluent HTTP client with an interceptor chain and pluggable response bindings.
//!
//! A [`Fetch`] holds the shared configuration (base URL, interceptors,
//! bindings, default headers, timeout). Each request starts a [`Call`] that
//! accumulates query parameters, headers and a body, then dispatches through
//! the interceptor [`Chain`] to the transport. The drained body comes back in
//! a [`Reply`] and can be bound into any `serde` type by binding name.
//!
//! # Example
//!
//! ```no_run
//! use fetchkit::{Fetch, LogInterceptor};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct BaseResp {
//!     code: i32,
//!     msg: String,
//! }
//!
//! #[derive(Serialize)]
//! struct NewUser<'a> {
//!     name: &'a str,
//! }
//!
//! # async fn run() -> fetchkit::Result<()> {
//! let api = Fetch::builder()
//!     .base_url("https://api.example.com/v1/")
//!     .interceptor(LogInterceptor::new().into())
//!     .build()?;
//!
//! let mut resp = BaseResp::default();
//! api.post("users")
//!     .query("source", "docs")
//!     .json(NewUser { name: "ming" })
//!     .bind_json(&mut resp)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Interceptors
//!
//! An interceptor is a named async function receiving the request and a
//! [`Next`] continuation. Interceptors run in registration order on the way
//! out and in reverse order on the way back:
//!
//! ```
//! use fetchkit::{Context, Fetch, Interceptor, Next, Request};
//!
//! # fn run() -> fetchkit::Result<()> {
//! let stamp = Interceptor::new("stamp", |ctx: Context, mut req: Request, next: Next| async move {
//!     req.headers_mut().insert("x-client", fetchkit::header::HeaderValue::from_static("fetchkit"));
//!     next.run(ctx, req).await
//! })?;
//!
//! let api = Fetch::default().with_interceptor(stamp);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod debug;
pub mod interceptors;
pub mod prelude;
mod reply;
mod retry;
mod terminal;
mod transport;

pub use client::{Call, DEFAULT_TIMEOUT, Fetch, FetchBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use interceptors::{BearerAuthInterceptor, LogInterceptor, LogLevel, RetryInterceptor};
#[cfg(feature = "interceptor-basic-auth")]
pub use interceptors::BasicAuthInterceptor;
pub use reply::Reply;
pub use retry::{retry, retry_if};
pub use transport::{HyperTransport, ResponseBody, Transport};

// Re-export core types
pub use fetchkit_core::{
    BindTarget, Binding, Bindings, BodyEncoder, BoxFuture, CancellationToken, Chain,
    ContentType, Context, Encoded, Error, Form, Handler, HeaderMap, Intercept, Interceptor,
    Json, JsonBinding, Method, Multipart, NamedIntercept, Next, Outcome, Part, Request,
    Response, Result, Scalar, Xml, XmlBinding, from_json, resolve_reference,
    sniff_content_type, to_query_pairs,
};

// Re-export http types for status codes and headers
pub use fetchkit_core::{StatusCode, header};
