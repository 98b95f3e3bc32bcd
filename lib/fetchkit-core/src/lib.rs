//! Core types for the fetchkit HTTP client.
//!
//! This crate holds everything that does not touch the network:
//! - [`Request`], [`Response`] and [`Outcome`] - the values flowing through a dispatch
//! - [`Chain`], [`Interceptor`] and [`Next`] - the interceptor chain
//! - [`Context`] - cancellation and deadline
//! - [`Json`], [`Xml`], [`Form`] and [`Multipart`] - body encoders
//! - [`Bindings`] - named response decoders
//! - [`Error`] and [`Result`] - error handling
//! - [`StatusCode`] and [`header`] - re-exported from the `http` crate

mod binding;
mod body;
mod context;
mod error;
mod interceptor;
mod method;
mod multipart;
pub mod prelude;
mod request;
mod resolve;
mod response;
mod scalar;

pub use binding::{BindTarget, Binding, Bindings, JsonBinding, XmlBinding, from_json};
pub use body::{BodyEncoder, ContentType, Encoded, Form, Json, Xml, to_query_pairs};
pub use context::Context;
pub use error::{Error, Result};
pub use interceptor::{BoxFuture, Chain, Handler, Intercept, Interceptor, NamedIntercept, Next};
pub use method::Method;
pub use multipart::{Multipart, Part, sniff_content_type};
pub use request::Request;
pub use resolve::resolve_reference;
pub use response::{Outcome, Response};
pub use scalar::Scalar;

pub use http::{HeaderMap, StatusCode, header};
pub use tokio_util::sync::CancellationToken;
