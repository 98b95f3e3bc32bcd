//! Prelude module for convenient imports.
//!
//! ```ignore
//! use fetchkit_core::prelude::*;
//! ```

pub use crate::{
    BodyEncoder, Chain, Context, Error, Form, Interceptor, Json, Method, Multipart, Next, Outcome,
    Part, Request, Response, Result, Xml,
};
