//! Request body encoders.
//!
//! Each encoder turns a payload into bytes plus the `Content-Type` that
//! describes them. Encoders are plain values, built fresh for each call.
//!
//! - [`Json`] - `application/json`
//! - [`Xml`] - `application/xml`
//! - [`Form`] - `application/x-www-form-urlencoded`
//! - [`Multipart`](crate::Multipart) - `multipart/form-data`

use bytes::Bytes;

use crate::{Error, Result, Scalar};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// XML content type (`application/xml`).
    Xml,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain; charset=utf-8`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An encoded body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Body bytes.
    pub bytes: Bytes,
    /// Value for the `Content-Type` header.
    pub content_type: String,
}

impl Encoded {
    /// Creates an encoded body.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}

/// A strategy producing a request body.
///
/// The content type is returned together with the bytes because some
/// encodings (multipart) only know it once the body has been written.
pub trait BodyEncoder {
    /// Encode the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if the payload cannot be serialized.
    fn encode(&self) -> Result<Encoded>;
}

#[derive(Debug, Clone)]
enum Payload<T> {
    Raw(Bytes),
    Value(T),
}

/// JSON body.
///
/// # Example
///
/// ```
/// use fetchkit_core::{BodyEncoder, Json};
///
/// #[derive(serde::Serialize)]
/// struct User { name: String }
///
/// let encoded = Json::new(User { name: "Alice".to_string() }).encode().unwrap();
/// assert_eq!(encoded.bytes.as_ref(), br#"{"name":"Alice"}"#);
/// assert_eq!(encoded.content_type, "application/json");
///
/// let raw = Json::raw(r#"{"already":"encoded"}"#).encode().unwrap();
/// assert_eq!(raw.bytes.as_ref(), br#"{"already":"encoded"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct Json<T = ()> {
    payload: Payload<T>,
}

impl<T: serde::Serialize> Json<T> {
    /// Serialize `value` with `serde_json` when encoded.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            payload: Payload::Value(value),
        }
    }
}

impl Json {
    /// Send an already encoded JSON document verbatim.
    #[must_use]
    pub fn raw(document: impl Into<Bytes>) -> Self {
        Self {
            payload: Payload::Raw(document.into()),
        }
    }
}

impl<T: serde::Serialize> BodyEncoder for Json<T> {
    fn encode(&self) -> Result<Encoded> {
        let bytes = match &self.payload {
            Payload::Raw(bytes) => bytes.clone(),
            Payload::Value(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(Error::encoding)?,
        };
        Ok(Encoded::new(bytes, ContentType::Json.as_str()))
    }
}

/// XML body.
///
/// Structured values are serialized with `quick-xml`; the root element is
/// named after the type.
#[derive(Debug, Clone)]
pub struct Xml<T = ()> {
    payload: Payload<T>,
}

impl<T: serde::Serialize> Xml<T> {
    /// Serialize `value` with `quick-xml` when encoded.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            payload: Payload::Value(value),
        }
    }
}

impl Xml {
    /// Send an already encoded XML document verbatim.
    #[must_use]
    pub fn raw(document: impl Into<Bytes>) -> Self {
        Self {
            payload: Payload::Raw(document.into()),
        }
    }
}

impl<T: serde::Serialize> BodyEncoder for Xml<T> {
    fn encode(&self) -> Result<Encoded> {
        let bytes = match &self.payload {
            Payload::Raw(bytes) => bytes.clone(),
            Payload::Value(value) => quick_xml::se::to_string(value)
                .map(|s| Bytes::from(s.into_bytes()))
                .map_err(Error::encoding)?,
        };
        Ok(Encoded::new(bytes, ContentType::Xml.as_str()))
    }
}

/// URL-encoded form body.
///
/// Fields are kept in insertion order; repeated names are allowed.
///
/// ```
/// use fetchkit_core::{BodyEncoder, Form};
///
/// let encoded = Form::new([("name", "cc"), ("city", "Saint-Étienne")]).encode().unwrap();
/// assert_eq!(encoded.bytes.as_ref(), b"name=cc&city=Saint-%C3%89tienne");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    /// Creates a form from name/value pairs.
    #[must_use]
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Scalar>,
    {
        Self::default().fields(fields)
    }

    /// Appends one field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.push((name.into(), value.into().into()));
        self
    }

    /// Appends many fields.
    #[must_use]
    pub fn fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Scalar>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into().into())));
        self
    }
}

impl BodyEncoder for Form {
    fn encode(&self) -> Result<Encoded> {
        let body = serde_urlencoded::to_string(&self.fields).map_err(Error::encoding)?;
        Ok(Encoded::new(body, ContentType::FormUrlEncoded.as_str()))
    }
}

/// Serialize a value into query pairs.
///
/// Uses `serde_html_form`, so `Vec<T>` fields become repeated parameters
/// (`tags=a&tags=b`).
///
/// # Errors
///
/// Returns an error if the value is not a flat struct or map.
pub fn to_query_pairs<T: serde::Serialize>(value: &T) -> Result<Vec<(String, String)>> {
    let encoded = serde_html_form::to_string(value).map_err(Error::encoding)?;
    Ok(url::form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect())
}
