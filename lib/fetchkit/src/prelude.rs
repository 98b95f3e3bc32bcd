//! Prelude module for convenient imports.
//!
//! ```ignore
//! use fetchkit::prelude::*;
//! ```

pub use crate::{
    Call, Context, Error, Fetch, Form, Interceptor, Json, Method, Multipart, Next, Outcome, Part,
    Reply, Request, Result, Xml,
};
pub use serde::{Deserialize, Serialize};
