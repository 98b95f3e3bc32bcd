//! Response bindings: named decoders from a drained body into a typed value.
//!
//! A [`Bindings`] registry maps names to [`Binding`] implementations and
//! comes pre-seeded with `"json"` and `"xml"`. Callers may register their
//! own decoders or override the defaults.
//!
//! Targets are caller-owned values; any `T: DeserializeOwned` is a
//! [`BindTarget`], so a binding can fill it without knowing its type.
//!
//! # Example
//!
//! ```
//! use fetchkit_core::{Bindings, Response};
//! use http::HeaderMap;
//!
//! #[derive(Debug, Default, serde::Deserialize)]
//! struct Reply { code: i32, msg: String }
//!
//! let bindings = Bindings::default();
//! let response = Response::new(200, HeaderMap::new());
//! let mut reply = Reply::default();
//! bindings.bind("json", &response, br#"{"code":0,"msg":"ok"}"#, &mut reply).unwrap();
//! assert_eq!(reply.msg, "ok");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{Error, Response, Result};

/// A caller-owned value a binding can decode into.
///
/// Implemented for every `T: DeserializeOwned`; the decoded value replaces
/// the previous content of the target.
pub trait BindTarget {
    /// Replace `self` with the value read from `deserializer`.
    ///
    /// # Errors
    ///
    /// Returns the deserializer's error if the input does not match the type.
    fn deserialize_from(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> std::result::Result<(), erased_serde::Error>;
}

impl<T: serde::de::DeserializeOwned> BindTarget for T {
    fn deserialize_from(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> std::result::Result<(), erased_serde::Error> {
        *self = erased_serde::deserialize(deserializer)?;
        Ok(())
    }
}

/// A named response decoder.
pub trait Binding: Send + Sync {
    /// Name the binding is registered under by default.
    fn name(&self) -> &str;

    /// Decode `body` into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decoding`] if the body does not match the target.
    fn bind(&self, response: &Response, body: &[u8], target: &mut dyn BindTarget) -> Result<()>;
}

/// Run `target` against a path-tracking wrapper around `deserializer`.
fn deserialize_tracked<'de, D>(deserializer: D, target: &mut dyn BindTarget) -> Result<()>
where
    D: serde::Deserializer<'de>,
{
    let mut track = serde_path_to_error::Track::new();
    let result = {
        let tracked = serde_path_to_error::Deserializer::new(deserializer, &mut track);
        let mut erased = <dyn erased_serde::Deserializer>::erase(tracked);
        target.deserialize_from(&mut erased)
    };
    result.map_err(|e| Error::decoding(track.path().to_string(), e.to_string()))
}

/// JSON binding, registered as `"json"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBinding;

impl Binding for JsonBinding {
    fn name(&self) -> &str {
        "json"
    }

    fn bind(&self, _response: &Response, body: &[u8], target: &mut dyn BindTarget) -> Result<()> {
        let mut deserializer = serde_json::Deserializer::from_slice(body);
        deserialize_tracked(&mut deserializer, target)?;
        deserializer
            .end()
            .map_err(|e| Error::decoding("", e.to_string()))
    }
}

/// XML binding, registered as `"xml"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlBinding;

impl Binding for XmlBinding {
    fn name(&self) -> &str {
        "xml"
    }

    fn bind(&self, _response: &Response, body: &[u8], target: &mut dyn BindTarget) -> Result<()> {
        let text = std::str::from_utf8(body).map_err(|e| Error::decoding("", e.to_string()))?;
        let mut deserializer = quick_xml::de::Deserializer::from_str(text);
        deserialize_tracked(&mut deserializer, target)
    }
}

/// Registry of bindings keyed by name.
#[derive(Clone)]
pub struct Bindings {
    by_name: HashMap<String, Arc<dyn Binding>>,
}

impl Default for Bindings {
    fn default() -> Self {
        Self::empty().with(JsonBinding).with(XmlBinding)
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("Bindings").field("names", &names).finish()
    }
}

impl Bindings {
    /// A registry without any binding.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    /// Registers `binding` under its own name, replacing any previous one.
    #[must_use]
    pub fn with(mut self, binding: impl Binding + 'static) -> Self {
        self.insert(Arc::new(binding));
        self
    }

    /// Registers `binding` under its own name, replacing any previous one.
    pub fn insert(&mut self, binding: Arc<dyn Binding>) {
        self.by_name.insert(binding.name().to_string(), binding);
    }

    /// Registers `binding` under `name`, replacing any previous one.
    pub fn insert_as(&mut self, name: impl Into<String>, binding: Arc<dyn Binding>) {
        self.by_name.insert(name.into(), binding);
    }

    /// Looks up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Binding>> {
        self.by_name.get(name)
    }

    /// Returns `true` if a binding is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Decodes `body` with the binding registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBinding`] if nothing is registered under
    /// `name`, or the binding's decoding error.
    pub fn bind(
        &self,
        name: &str,
        response: &Response,
        body: &[u8],
        target: &mut dyn BindTarget,
    ) -> Result<()> {
        let binding = self.get(name).ok_or_else(|| Error::unknown_binding(name))?;
        binding.bind(response, body, target)
    }
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns [`Error::Decoding`] with the path to the problematic field
/// (e.g. `user.address.city`).
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| Error::decoding(e.path().to_string(), e.inner().to_string()))
}
