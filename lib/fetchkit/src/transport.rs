//! Network transport used by the terminal handler.

use bytes::Bytes;
use fetchkit_core::{BoxFuture, Error, Result};
use http_body_util::{BodyExt, Full, combinators::UnsyncBoxBody};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};

use crate::ClientConfig;

/// Response body stream handed back by a [`Transport`].
pub type ResponseBody = UnsyncBoxBody<Bytes, Error>;

/// Sends one HTTP request and returns the response with its live body.
///
/// The terminal handler drains the body and bounds the whole exchange with
/// the dispatch deadline, so implementations need no timeout of their own.
pub trait Transport: Send + Sync + 'static {
    /// Send `request`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure.
    fn send(&self, request: http::Request<Full<Bytes>>)
    -> BoxFuture<'_, Result<http::Response<ResponseBody>>>;
}

/// Create an HTTPS connector with rustls.
///
/// Both HTTP/1.1 and HTTP/2 are enabled; TLS uses the Mozilla root
/// certificates. Plain `http` URLs are allowed.
fn https_connector(config: &ClientConfig) -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(config.connect_timeout));
    http.set_nodelay(config.tcp_nodelay);

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http)
}

/// Pooled hyper client over rustls.
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: ClientConfig,
}

impl HyperTransport {
    /// Create a transport with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with custom settings.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .retry_canceled_requests(config.retry_canceled_requests)
            .build(https_connector(&config));

        Self { inner, config }
    }

    /// Transport settings.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_error(err: hyper_util::client::legacy::Error) -> Error {
        if err.is_connect() {
            return Error::transport(format!("connect: {err}"));
        }
        Error::transport(err)
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Transport for HyperTransport {
    fn send(
        &self,
        request: http::Request<Full<Bytes>>,
    ) -> BoxFuture<'_, Result<http::Response<ResponseBody>>> {
        Box::pin(async move {
            let response = self
                .inner
                .request(request)
                .await
                .map_err(Self::map_error)?;
            Ok(response.map(|body| body.map_err(Error::transport).boxed_unsync()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_transport() {
        let transport = HyperTransport::with_config(ClientConfig::builder().pool_idle_per_host(4).build());
        assert_eq!(transport.config().pool_idle_per_host, 4);
        assert!(format!("{transport:?}").contains("HyperTransport"));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        // Port 9 (discard) is closed on test hosts
        let request = http::Request::get("http://127.0.0.1:9/")
            .body(Full::default())
            .expect("request");
        let err = HyperTransport::new()
            .send(request)
            .await
            .expect_err("connection refused");
        assert!(err.is_transport());
    }
}
