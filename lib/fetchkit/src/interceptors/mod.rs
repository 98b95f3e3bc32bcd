//! Built-in interceptors.
//!
//! Each one has a fixed registration name and converts into an
//! [`Interceptor`](crate::Interceptor) with `.into()`:
//!
//! | Interceptor | Name | Effect |
//! |-------------|------|--------|
//! | [`LogInterceptor`] | `log` | Logs requests and responses with `tracing` |
//! | [`BearerAuthInterceptor`] | `bearer-auth` | Adds `Authorization: Bearer <token>` |
//! | [`BasicAuthInterceptor`] | `basic-auth` | Adds `Authorization: Basic <base64>` (feature `interceptor-basic-auth`) |
//! | [`RetryInterceptor`] | `retry` | Reruns the inner chain on transport errors, 5xx and 429 |
//!
//! Registration order is call order: the first interceptor sees the request
//! first and the outcome last.
//!
//! ```
//! use fetchkit::{BearerAuthInterceptor, Fetch, LogInterceptor, RetryInterceptor};
//!
//! # fn run() -> fetchkit::Result<()> {
//! let fetch = Fetch::builder()
//!     .base_url("https://api.example.com/")
//!     .interceptor(LogInterceptor::new().into())
//!     .interceptor(BearerAuthInterceptor::new("token")?.into())
//!     .interceptor(RetryInterceptor::new(2).into())
//!     .build()?;
//! assert_eq!(fetch.chain().names().collect::<Vec<_>>(), ["log", "bearer-auth", "retry"]);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

#[cfg(feature = "interceptor-basic-auth")]
mod basic_auth;
mod bearer_auth;
mod logging;
mod retry;

#[cfg(feature = "interceptor-basic-auth")]
pub use basic_auth::BasicAuthInterceptor;
pub use bearer_auth::BearerAuthInterceptor;
pub use logging::{LogInterceptor, LogLevel};
pub use retry::RetryInterceptor;
