//! Multipart form data support for file uploads.
//!
//! # Example
//!
//! ```
//! use fetchkit_core::{BodyEncoder, Multipart, Part};
//!
//! let form = Multipart::new()
//!     .field("name", "John Doe")
//!     .field("age", 42)
//!     .file(Part::file("avatar", "photo.png", b"\x89PNG\r\n\x1a\n".to_vec()));
//!
//! let encoded = form.encode().unwrap();
//! assert!(encoded.content_type.starts_with("multipart/form-data; boundary="));
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{BodyEncoder, Encoded, Error, Result, Scalar};

/// A file part in a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    field: String,
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a file part.
    ///
    /// The content type is sniffed from the data unless set with
    /// [`Part::content_type`].
    #[must_use]
    pub fn file(
        field: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            content_type: None,
            data: data.into(),
        }
    }

    /// Set an explicit content type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Form field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// File name sent in the `Content-Disposition` header.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Content type sent for this part: the explicit one, or a sniffed one.
    #[must_use]
    pub fn effective_content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| sniff_content_type(&self.data).to_string())
    }

    /// Part data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// A multipart form: plain fields followed by file parts.
#[derive(Debug, Clone)]
pub struct Multipart {
    fields: Vec<(String, String)>,
    files: Vec<Part>,
    boundary: String,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    /// Create a new empty form with a random boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a new form with a custom boundary.
    ///
    /// The boundary should be a unique string that doesn't appear in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            files: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a plain field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.push((name.into(), value.into().into()));
        self
    }

    /// Add many plain fields.
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

    /// Add a file part.
    #[must_use]
    pub fn file(mut self, part: Part) -> Self {
        self.files.push(part);
        self
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    fn write_disposition(buf: &mut BytesMut, name: &str, filename: Option<&str>) {
        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(escape_quotes(name).as_bytes());
        buf.put_slice(b"\"");
        if let Some(filename) = filename {
            buf.put_slice(b"; filename=\"");
            buf.put_slice(escape_quotes(filename).as_bytes());
            buf.put_slice(b"\"");
        }
        buf.put_slice(b"\r\n");
    }

    fn write_boundary(&self, buf: &mut BytesMut) {
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"\r\n");
    }
}

impl BodyEncoder for Multipart {
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] when the boundary is empty or longer than
    /// 70 characters, or when the boundary, a name, a filename or a content
    /// type contains a control character.
    fn encode(&self) -> Result<Encoded> {
        if self.boundary.is_empty() || self.boundary.len() > 70 {
            return Err(Error::encoding(format!(
                "multipart boundary must be 1 to 70 characters, got {}",
                self.boundary.len()
            )));
        }
        check_header_text("boundary", &self.boundary)?;
        for (name, _) in &self.fields {
            check_header_text("field name", name)?;
        }
        for part in &self.files {
            check_header_text("field name", &part.field)?;
            check_header_text("filename", &part.filename)?;
            if let Some(content_type) = &part.content_type {
                check_header_text("content type", content_type)?;
            }
        }

        let mut buf = BytesMut::new();

        for (name, value) in &self.fields {
            self.write_boundary(&mut buf);
            Self::write_disposition(&mut buf, name, None);
            buf.put_slice(b"\r\n");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }

        for part in &self.files {
            self.write_boundary(&mut buf);
            Self::write_disposition(&mut buf, &part.field, Some(&part.filename));
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(part.effective_content_type().as_bytes());
            buf.put_slice(b"\r\n\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        Ok(Encoded::new(
            buf.freeze(),
            format!("multipart/form-data; boundary={}", self.boundary),
        ))
    }
}

/// Values written into part headers must stay on one line.
fn check_header_text(what: &str, value: &str) -> Result<()> {
    if value.chars().any(char::is_control) {
        return Err(Error::encoding(format!(
            "multipart {what} contains a control character: {value:?}"
        )));
    }
    Ok(())
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Generate a random boundary string.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----FetchkitBoundary{timestamp:x}")
}

const SNIFF_LEN: usize = 512;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"Rar!\x1A\x07", "application/x-rar-compressed"),
    (b"\x00asm", "application/wasm"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
];

const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<BODY",
    b"<SCRIPT",
    b"<TITLE",
    b"<P",
    b"<DIV",
];

/// Guess a content type from the first bytes of `data`.
///
/// Checks well-known magic numbers, then markup prefixes, then falls back
/// to `text/plain; charset=utf-8` for data free of binary control bytes
/// and `application/octet-stream` otherwise.
#[must_use]
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let head = data.get(..SNIFF_LEN).unwrap_or(data);

    if let Some((_, mime)) = SIGNATURES.iter().find(|(sig, _)| head.starts_with(sig)) {
        return *mime;
    }

    if riff_kind(head, b"WEBP") {
        return "image/webp";
    }
    if riff_kind(head, b"WAVE") {
        return "audio/wave";
    }
    if riff_kind(head, b"AVI ") {
        return "video/avi";
    }
    if head.get(4..8) == Some(&b"ftyp"[..]) {
        return "video/mp4";
    }

    let text = trim_leading_whitespace(head);
    if starts_with_ignore_case(text, b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    if HTML_TAGS.iter().any(|tag| starts_with_tag(text, tag)) {
        return "text/html; charset=utf-8";
    }

    if head.iter().any(|&b| is_binary_byte(b)) {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn riff_kind(head: &[u8], kind: &[u8]) -> bool {
    head.starts_with(b"RIFF") && head.get(8..12) == Some(kind)
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    data.get(start..).unwrap_or_default()
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

// The tag must be followed by a space or '>' so that "<PRE" is not "<P".
fn starts_with_tag(data: &[u8], tag: &[u8]) -> bool {
    starts_with_ignore_case(data, tag) && matches!(data.get(tag.len()), Some(b' ' | b'>'))
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_accessors() {
        let part = Part::file("upload", "photo.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(part.field(), "upload");
        assert_eq!(part.filename(), "photo.jpg");
        assert_eq!(part.effective_content_type(), "image/jpeg");

        let part = part.content_type("application/custom");
        assert_eq!(part.effective_content_type(), "application/custom");
    }

    #[test]
    fn form_empty() {
        let form = Multipart::new();
        assert!(form.boundary().starts_with("----FetchkitBoundary"));

        let encoded = form.encode().expect("encode");
        assert_eq!(
            encoded.bytes.as_ref(),
            format!("--{}--\r\n", form.boundary()).as_bytes()
        );
    }

    #[test]
    fn form_encode_fields() {
        let encoded = Multipart::with_boundary("boundary123")
            .field("name", "cc")
            .field("age", 18)
            .encode()
            .expect("encode");

        assert_eq!(
            encoded.content_type,
            "multipart/form-data; boundary=boundary123"
        );
        assert_eq!(
            String::from_utf8_lossy(&encoded.bytes),
            "--boundary123\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\
             \r\n\
             cc\r\n\
             --boundary123\r\n\
             Content-Disposition: form-data; name=\"age\"\r\n\
             \r\n\
             18\r\n\
             --boundary123--\r\n"
        );
    }

    #[test]
    fn form_encode_with_file() {
        let encoded = Multipart::with_boundary("boundary456")
            .file(Part::file("upload", "test.txt", "file content"))
            .encode()
            .expect("encode");

        let body = String::from_utf8_lossy(&encoded.bytes);
        assert!(body.contains("name=\"upload\"; filename=\"test.txt\"\r\n"));
        assert!(body.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(body.contains("\r\n\r\nfile content\r\n"));
        assert!(body.ends_with("--boundary456--\r\n"));
    }

    #[test]
    fn form_escapes_quotes() {
        let encoded = Multipart::with_boundary("b")
            .file(Part::file("f", "my \"file\".bin", vec![0u8, 1, 2]))
            .encode()
            .expect("encode");

        let body = String::from_utf8_lossy(&encoded.bytes);
        assert!(body.contains("filename=\"my \\\"file\\\".bin\""));
        assert!(body.contains("Content-Type: application/octet-stream\r\n"));
    }

    #[test]
    fn form_rejects_line_breaks_in_part_headers() {
        let injected = Multipart::with_boundary("b").file(
            Part::file("f", "a.txt", "x").content_type("text/plain\r\nX-Injected: 1"),
        );
        let err = injected.encode().expect_err("content type with CRLF");
        assert!(matches!(err, Error::Encoding(_)));

        let err = Multipart::with_boundary("b\r\n--evil")
            .field("a", 1)
            .encode()
            .expect_err("boundary with CRLF");
        assert!(matches!(err, Error::Encoding(_)));

        let err = Multipart::with_boundary("b")
            .file(Part::file("f", "a\n.txt", "x"))
            .encode()
            .expect_err("filename with LF");
        assert!(matches!(err, Error::Encoding(_)));

        assert!(Multipart::with_boundary("").encode().is_err());
        assert!(Multipart::with_boundary("x".repeat(71)).encode().is_err());
    }

    #[test]
    fn sniff_magic_numbers() {
        assert_eq!(sniff_content_type(b"\x89PNG\r\n\x1a\nrest"), "image/png");
        assert_eq!(sniff_content_type(b"GIF89a...."), "image/gif");
        assert_eq!(sniff_content_type(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff_content_type(b"PK\x03\x04data"), "application/zip");
        assert_eq!(sniff_content_type(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_content_type(b"\x00\x00\x00\x18ftypmp42"), "video/mp4");
    }

    #[test]
    fn sniff_markup_and_text() {
        assert_eq!(
            sniff_content_type(b"  <?xml version=\"1.0\"?><a/>"),
            "text/xml; charset=utf-8"
        );
        assert_eq!(
            sniff_content_type(b"<html><body></body></html>"),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            sniff_content_type(b"<pre>not html</pre>"),
            "text/plain; charset=utf-8"
        );
        assert_eq!(sniff_content_type(b"hello"), "text/plain; charset=utf-8");
        assert_eq!(sniff_content_type(b""), "text/plain; charset=utf-8");
        assert_eq!(
            sniff_content_type(&[0x01, 0x02, 0x03]),
            "application/octet-stream"
        );
    }
}
