//! Wire-style dumps of requests and responses for debug mode.
//!
//! Dumps are emitted with `tracing::debug!` under the `fetchkit::debug`
//! target. Rendering problems are logged and never fail the dispatch.

use std::fmt::{self, Write};

use bytes::Bytes;
use fetchkit_core::{HeaderMap, Request, Response};

/// Log the outgoing request.
pub(crate) fn dump_request(request: &Request) {
    let mut dump = String::new();
    let rendered = render_request(&mut dump, request);
    emit(rendered, &dump, "request");
}

/// Log the drained response.
pub(crate) fn dump_response(response: &Response, body: &Bytes) {
    let mut dump = String::new();
    let rendered = render_response(&mut dump, response, body);
    emit(rendered, &dump, "response");
}

fn emit(rendered: fmt::Result, dump: &str, what: &str) {
    match rendered {
        Ok(()) => tracing::debug!(target: "fetchkit::debug", "{dump}"),
        Err(err) => {
            tracing::warn!(target: "fetchkit::debug", error = %err, "failed to dump {what}");
        }
    }
}

fn render_request(out: &mut String, request: &Request) -> fmt::Result {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    writeln!(out, "{} {target} HTTP/1.1", request.method())?;
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => writeln!(out, "host: {host}:{port}")?,
            None => writeln!(out, "host: {host}")?,
        }
    }
    render_headers(out, request.headers())?;
    if let Some(body) = request.body() {
        render_body(out, body)?;
    }
    Ok(())
}

fn render_response(out: &mut String, response: &Response, body: &Bytes) -> fmt::Result {
    let status = http::StatusCode::from_u16(response.status())
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default();
    writeln!(out, "{:?} {} {status}", response.version(), response.status())?;
    render_headers(out, response.headers())?;
    render_body(out, body)
}

fn render_headers(out: &mut String, headers: &HeaderMap) -> fmt::Result {
    for (name, value) in headers {
        match value.to_str() {
            Ok(value) => writeln!(out, "{name}: {value}")?,
            Err(_) => writeln!(out, "{name}: <{} opaque bytes>", value.len())?,
        }
    }
    Ok(())
}

fn render_body(out: &mut String, body: &[u8]) -> fmt::Result {
    writeln!(out)?;
    write!(out, "{}", String::from_utf8_lossy(body))
}
