//! The client: [`Fetch`] holds the shared configuration, [`Call`] builds and
//! dispatches one request.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fetchkit_core::{
    BindTarget, Binding, Bindings, BodyEncoder, Chain, Context, Encoded, Error, Form, Handler,
    HeaderMap, Interceptor, Json, Method, Multipart, Outcome, Request, Result, Scalar, Xml,
    resolve_reference, to_query_pairs,
};
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use tracing::Instrument;
use url::Url;

use crate::{ClientConfig, HyperTransport, Reply, Transport, terminal::Terminal};

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Configuration snapshot
// ============================================================================

#[derive(Clone)]
struct Config {
    base_url: Option<Url>,
    transport: Arc<dyn Transport>,
    chain: Chain,
    bindings: Arc<Bindings>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    debug: bool,
}

// ============================================================================
// Fetch
// ============================================================================

/// A configured HTTP client.
///
/// Cloning is cheap and every clone shares the same configuration snapshot.
/// The `with_*` methods never touch a snapshot other clones can see: they
/// return a client with its own updated copy, so dispatches already running
/// keep the configuration they started with.
///
/// # Example
///
/// ```no_run
/// use fetchkit::Fetch;
///
/// #[derive(Debug, Default, serde::Deserialize)]
/// struct Profile { name: String }
///
/// # async fn run() -> fetchkit::Result<()> {
/// let api = Fetch::new("https://api.example.com/v1/")?;
///
/// let mut profile = Profile::default();
/// api.get("user/profile")
///     .query("id", 10)
///     .header("accept", "application/json")
///     .bind_json(&mut profile)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Fetch {
    config: Arc<Config>,
}

impl Fetch {
    /// A client resolving relative paths against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> FetchBuilder {
        FetchBuilder::default()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Base URL, if any.
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.config.base_url.as_ref()
    }

    /// Interceptor chain.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.config.chain
    }

    /// Binding registry.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.config.bindings
    }

    /// Headers added to every request.
    #[must_use]
    pub fn default_headers(&self) -> &HeaderMap {
        &self.config.headers
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    /// Returns `true` if requests and responses are dumped.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.config.debug
    }

    // ========================================================================
    // Copy-on-write configuration
    // ========================================================================

    fn config_mut(&mut self) -> &mut Config {
        Arc::make_mut(&mut self.config)
    }

    /// Add `interceptor`, or replace the one with the same name in place.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Interceptor) -> Self {
        let config = self.config_mut();
        config.chain = config.chain.with(interceptor);
        self
    }

    /// Remove the interceptor named `name`.
    #[must_use]
    pub fn without_interceptor(mut self, name: &str) -> Self {
        let config = self.config_mut();
        config.chain = config.chain.without(name);
        self
    }

    /// Register `binding` under its own name, replacing any previous one.
    #[must_use]
    pub fn with_binding(mut self, binding: impl Binding + 'static) -> Self {
        Arc::make_mut(&mut self.config_mut().bindings).insert(Arc::new(binding));
        self
    }

    /// Switch request/response dumps on or off.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config_mut().debug = debug;
        self
    }

    /// Replace the request timeout; `None` disables it.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config_mut().timeout = timeout;
        self
    }

    /// Add a default header, replacing previous values of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the name or value is not a
    /// valid header.
    pub fn with_header(mut self, name: &str, value: impl Into<Scalar>) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.config_mut().headers.insert(name, value);
        Ok(self)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Start a request with `method` on `path`, resolved against the base URL.
    pub fn request(&self, method: Method, path: &str) -> Call {
        Call::new(self.clone(), method, path)
    }

    /// Start a `GET` request.
    pub fn get(&self, path: &str) -> Call {
        self.request(Method::Get, path)
    }

    /// Start a `POST` request.
    pub fn post(&self, path: &str) -> Call {
        self.request(Method::Post, path)
    }

    /// Start a `PUT` request.
    pub fn put(&self, path: &str) -> Call {
        self.request(Method::Put, path)
    }

    /// Start a `PATCH` request.
    pub fn patch(&self, path: &str) -> Call {
        self.request(Method::Patch, path)
    }

    /// Start a `DELETE` request.
    pub fn delete(&self, path: &str) -> Call {
        self.request(Method::Delete, path)
    }

    /// Start a `HEAD` request.
    pub fn head(&self, path: &str) -> Call {
        self.request(Method::Head, path)
    }

    /// Start an `OPTIONS` request.
    pub fn options(&self, path: &str) -> Call {
        self.request(Method::Options, path)
    }

    /// Run an already built request through the chain and the transport.
    ///
    /// The request timeout tightens the deadline of `ctx` before the first
    /// interceptor runs, so it bounds the whole chain, retries included.
    pub async fn execute(&self, ctx: Context, request: Request) -> Outcome {
        let ctx = match request.timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        };
        let span = tracing::debug_span!(
            "fetch",
            method = %request.method(),
            url = %request.url()
        );
        let terminal: Arc<dyn Handler> = Arc::new(Terminal::new(
            Arc::clone(&self.config.transport),
            self.config.debug,
        ));

        self.config
            .chain
            .call(ctx, request, terminal)
            .instrument(span)
            .await
    }

    fn reply(&self, outcome: Outcome) -> Reply {
        Reply::new(outcome, Arc::clone(&self.config.bindings))
    }
}

impl Default for Fetch {
    fn default() -> Self {
        FetchBuilder::default().build_with_base(None)
    }
}

impl fmt::Debug for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetch")
            .field("base_url", &self.config.base_url.as_ref().map(Url::as_str))
            .field("chain", &self.config.chain)
            .field("bindings", &self.config.bindings)
            .field("timeout", &self.config.timeout)
            .field("debug", &self.config.debug)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FetchBuilder
// ============================================================================

/// Builder for [`Fetch`].
///
/// ```no_run
/// use std::time::Duration;
/// use fetchkit::{Fetch, LogInterceptor};
///
/// # fn run() -> fetchkit::Result<()> {
/// let api = Fetch::builder()
///     .base_url("https://api.example.com/")
///     .interceptor(LogInterceptor::new().into())
///     .header("user-agent", "fetchkit")
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct FetchBuilder {
    base_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    client_config: ClientConfig,
    interceptors: Vec<Interceptor>,
    bindings: Bindings,
    headers: Vec<(String, Scalar)>,
    timeout: Option<Duration>,
    debug: bool,
}

impl Default for FetchBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            transport: None,
            client_config: ClientConfig::default(),
            interceptors: Vec::new(),
            bindings: Bindings::default(),
            headers: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            debug: false,
        }
    }
}

impl fmt::Debug for FetchBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchBuilder")
            .field("base_url", &self.base_url)
            .field("custom_transport", &self.transport.is_some())
            .field("client_config", &self.client_config)
            .field("interceptors", &self.interceptors)
            .field("bindings", &self.bindings)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl FetchBuilder {
    /// Set the base URL relative paths are resolved against.
    ///
    /// A base ending in `/` is a directory: `user` appends to it. Without
    /// the trailing slash the last segment is replaced.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Use a custom transport instead of the hyper one.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Settings for the default hyper transport.
    #[must_use]
    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    /// Append an interceptor; a later one with the same name replaces it in place.
    #[must_use]
    pub fn interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Append several interceptors.
    #[must_use]
    pub fn interceptors(mut self, interceptors: impl IntoIterator<Item = Interceptor>) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    /// Register `binding` under its own name, replacing any previous one.
    #[must_use]
    pub fn binding(mut self, binding: impl Binding + 'static) -> Self {
        self.bindings.insert(Arc::new(binding));
        self
    }

    /// Register `binding` under `name`.
    #[must_use]
    pub fn binding_as(mut self, name: impl Into<String>, binding: impl Binding + 'static) -> Self {
        self.bindings.insert_as(name, Arc::new(binding));
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the request timeout.
    #[must_use]
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Dump requests and responses through `tracing`.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] for a malformed base URL and
    /// [`Error::InvalidRequest`] for an invalid default header.
    pub fn build(mut self) -> Result<Fetch> {
        let base_url = self.base_url.take().map(|s| Url::parse(&s)).transpose()?;

        let mut headers = HeaderMap::new();
        for (name, value) in std::mem::take(&mut self.headers) {
            let (name, value) = parse_header(&name, value)?;
            headers.append(name, value);
        }

        let mut fetch = self.build_with_base(base_url);
        fetch.config_mut().headers = headers;
        Ok(fetch)
    }

    fn build_with_base(self, base_url: Option<Url>) -> Fetch {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HyperTransport::with_config(self.client_config)));

        Fetch {
            config: Arc::new(Config {
                base_url,
                transport,
                chain: Chain::new(self.interceptors),
                bindings: Arc::new(self.bindings),
                headers: HeaderMap::new(),
                timeout: self.timeout,
                debug: self.debug,
            }),
        }
    }
}

// ============================================================================
// Call
// ============================================================================

/// One request being built.
///
/// Setters accumulate state without any I/O; invalid input (a bad header,
/// an unresolvable path, a failing encoder) is kept and reported when the
/// call is dispatched, before any interceptor runs.
///
/// Bodies are only accepted on `POST`, `PUT` and `PATCH`; dispatching a
/// body with another method fails with [`Error::InvalidRequest`].
///
/// A query string written in the path is split into parameters so that
/// [`set_query`](Self::set_query) can replace them. Parameters are
/// re-encoded on dispatch: bare keys such as `?flag` stay bare, but
/// percent escapes come out in canonical form.
#[must_use = "a call does nothing until it is dispatched"]
pub struct Call {
    fetch: Fetch,
    method: Method,
    url: Result<Url>,
    query: Vec<(String, Option<String>)>,
    headers: HeaderMap,
    body: Option<Result<Encoded>>,
    timeout: Option<Duration>,
    context: Option<Context>,
    error: Option<Error>,
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("method", &self.method)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Call {
    fn new(fetch: Fetch, method: Method, path: &str) -> Self {
        let mut query = Vec::new();
        let url = resolve_reference(fetch.base_url(), path).map(|mut url| {
            if let Some(raw) = url.query() {
                query = split_query(raw);
            }
            url.set_query(None);
            url
        });
        let headers = fetch.config.headers.clone();

        Self {
            fetch,
            method,
            url,
            query,
            headers,
            body: None,
            timeout: None,
            context: None,
            error: None,
        }
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.query.push((key.into(), Some(value.into().into())));
        self
    }

    /// Replace every value of a query parameter.
    pub fn set_query(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        let key = key.into();
        self.query.retain(|(k, _)| *k != key);
        self.query.push((key, Some(value.into().into())));
        self
    }

    /// Append several query parameters.
    pub fn query_many<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Scalar>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), Some(v.into().into()))));
        self
    }

    /// Append the fields of a serializable struct or map.
    pub fn query_struct<T: serde::Serialize>(mut self, value: &T) -> Self {
        match to_query_pairs(value) {
            Ok(pairs) => self.query.extend(pairs.into_iter().map(|(k, v)| (k, Some(v)))),
            Err(error) => self.fail(error),
        }
        self
    }

    // ========================================================================
    // Headers
    // ========================================================================

    /// Append a header value.
    pub fn header(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        match parse_header(name, value) {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(error) => self.fail(error),
        }
        self
    }

    /// Replace every value of a header.
    pub fn set_header(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        match parse_header(name, value) {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(error) => self.fail(error),
        }
        self
    }

    // ========================================================================
    // Body
    // ========================================================================

    /// Encode `encoder` as the request body.
    ///
    /// The encoder's content type replaces any `Content-Type` header when
    /// the call is dispatched.
    pub fn body(mut self, encoder: impl BodyEncoder) -> Self {
        self.body = Some(encoder.encode());
        self
    }

    /// JSON body.
    pub fn json<T: serde::Serialize>(self, value: T) -> Self {
        self.body(Json::new(value))
    }

    /// XML body.
    pub fn xml<T: serde::Serialize>(self, value: T) -> Self {
        self.body(Xml::new(value))
    }

    /// URL-encoded form body.
    pub fn form(self, form: Form) -> Self {
        self.body(form)
    }

    /// Multipart form body.
    pub fn multipart(self, multipart: Multipart) -> Self {
        self.body(multipart)
    }

    // ========================================================================
    // Dispatch options
    // ========================================================================

    /// Override the client timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cancel and bound this call with `ctx`.
    pub fn context(mut self, ctx: Context) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Validate the accumulated state and build the request.
    fn prepare(self) -> Result<(Context, Request)> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut url = self.url?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::invalid_request(format!(
                "not an HTTP URL: {url}"
            )));
        }
        url.set_fragment(None);
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                match value {
                    Some(value) => pairs.append_pair(key, value),
                    None => pairs.append_key_only(key),
                };
            }
        }

        let mut headers = self.headers;
        let body = match self.body.transpose()? {
            Some(_) if !self.method.permits_body() => {
                return Err(Error::invalid_request(format!(
                    "{} request cannot carry a body",
                    self.method
                )));
            }
            Some(encoded) => {
                let content_type = HeaderValue::from_str(&encoded.content_type)
                    .map_err(|e| Error::invalid_request(format!("invalid content type: {e}")))?;
                headers.insert(CONTENT_TYPE, content_type);
                Some(encoded.bytes)
            }
            None => None,
        };

        let timeout = self.timeout.or(self.fetch.config.timeout);
        let request = Request::from_parts(self.method, url, headers, body, timeout);
        Ok((self.context.unwrap_or_default(), request))
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Dispatch and return the reply, whatever happened.
    pub async fn send(self) -> Reply {
        let fetch = self.fetch.clone();
        let outcome = match self.prepare() {
            Ok((ctx, request)) => fetch.execute(ctx, request).await,
            Err(error) => {
                tracing::debug!(%error, "request rejected before dispatch");
                Outcome::from_error(error)
            }
        };
        fetch.reply(outcome)
    }

    /// Dispatch and fail if the outcome carries an error.
    pub async fn response(self) -> Result<Reply> {
        let reply = self.send().await;
        match reply.error() {
            Some(error) => Err(error.clone()),
            None => Ok(reply),
        }
    }

    /// Dispatch and return the drained body.
    pub async fn bytes(self) -> Result<Bytes> {
        self.send().await.bytes()
    }

    /// Dispatch and return the body as text.
    pub async fn text(self) -> Result<String> {
        self.send().await.text()
    }

    /// Dispatch and decode the body with the binding registered under `name`.
    pub async fn bind<T: BindTarget + Send>(self, name: &str, target: &mut T) -> Result<()> {
        self.send().await.bind(name, target)
    }

    /// Dispatch and decode the body as JSON.
    pub async fn bind_json<T: BindTarget + Send>(self, target: &mut T) -> Result<()> {
        self.bind("json", target).await
    }

    /// Dispatch and decode the body as XML.
    pub async fn bind_xml<T: BindTarget + Send>(self, target: &mut T) -> Result<()> {
        self.bind("xml", target).await
    }
}

/// Split a raw query string into parameters, keeping keys without `=` bare.
fn split_query(raw: &str) -> Vec<(String, Option<String>)> {
    raw.split('&')
        .filter(|segment| !segment.is_empty())
        .flat_map(|segment| {
            let bare = !segment.contains('=');
            url::form_urlencoded::parse(segment.as_bytes())
                .map(move |(key, value)| (key.into_owned(), (!bare).then(|| value.into_owned())))
        })
        .collect()
}

fn parse_header(name: &str, value: impl Into<Scalar>) -> Result<(HeaderName, HeaderValue)> {
    let header = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::invalid_request(format!("invalid header name {name:?}: {e}")))?;
    let value: String = value.into().into();
    let value = HeaderValue::from_str(&value)
        .map_err(|e| Error::invalid_request(format!("invalid value for header {header}: {e}")))?;
    Ok((header, value))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use fetchkit_core::{BoxFuture, Next, Part};
    use http_body_util::{BodyExt, Full, combinators::UnsyncBoxBody};

    use super::*;
    use crate::ResponseBody;

    type Seen = Arc<Mutex<Vec<http::Request<Bytes>>>>;

    /// Records requests and answers `200` with the request URI as body.
    #[derive(Clone, Default)]
    struct Echo {
        seen: Seen,
    }

    impl Transport for Echo {
        fn send(
            &self,
            request: http::Request<Full<Bytes>>,
        ) -> BoxFuture<'_, Result<http::Response<ResponseBody>>> {
            Box::pin(async move {
                let (parts, body) = request.into_parts();
                let body = body.collect().await.map_err(Error::transport)?.to_bytes();
                let uri = parts.uri.to_string();
                self.seen
                    .lock()
                    .expect("lock")
                    .push(http::Request::from_parts(parts, body));

                let body: ResponseBody = UnsyncBoxBody::new(
                    Full::new(Bytes::from(uri)).map_err(|never| match never {}),
                );
                Ok(http::Response::new(body))
            })
        }
    }

    fn client(base: &str) -> (Fetch, Seen) {
        let echo = Echo::default();
        let seen = Arc::clone(&echo.seen);
        let fetch = Fetch::builder()
            .base_url(base)
            .transport(echo)
            .build()
            .expect("client");
        (fetch, seen)
    }

    fn resolved(call: &Call) -> &str {
        call.url.as_ref().map(Url::as_str).expect("resolved URL")
    }

    #[test]
    fn resolves_paths_against_base() {
        let (fetch, _) = client("http://h/v1/api/");
        assert_eq!(resolved(&fetch.get("user/profile")), "http://h/v1/api/user/profile");
        assert_eq!(resolved(&fetch.get("/user/profile")), "http://h/user/profile");
        assert_eq!(resolved(&fetch.get("../order")), "http://h/v1/order");
        assert_eq!(resolved(&fetch.get("https://other/x")), "https://other/x");

        let (fetch, _) = client("http://h/v1/api");
        assert_eq!(resolved(&fetch.get("user")), "http://h/v1/user");
    }

    #[tokio::test]
    async fn query_scenario() {
        let (fetch, _) = client("http://h/");
        let url = fetch
            .get("user")
            .query("id", 10)
            .query_struct(&BTreeMap::from([("name", "ming")]))
            .text()
            .await
            .expect("dispatch");

        let url = Url::parse(&url).expect("url");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("id".to_string(), "10".to_string())));
        assert!(pairs.contains(&("name".to_string(), "ming".to_string())));
    }

    #[tokio::test]
    async fn set_query_replaces_values_from_path_too() {
        let (fetch, _) = client("http://h/");
        let url = fetch
            .get("search?page=1&q=a")
            .query("q", "b")
            .set_query("page", 2)
            .text()
            .await
            .expect("dispatch");
        assert_eq!(url, "http://h/search?q=a&q=b&page=2");
    }

    #[tokio::test]
    async fn bare_query_keys_stay_bare() {
        let (fetch, _) = client("http://h/");
        let url = fetch
            .get("list?flag&sort=name&empty=")
            .query("page", 1)
            .text()
            .await
            .expect("dispatch");
        assert_eq!(url, "http://h/list?flag&sort=name&empty=&page=1");

        assert_eq!(
            split_query("a%20b&&c=d+e&f"),
            [
                ("a b".to_string(), None),
                ("c".to_string(), Some("d e".to_string())),
                ("f".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn calls_do_not_leak_state() {
        let (fetch, _) = client("http://h/");
        let first = fetch.get("a").query("x", 1).header("x-one", "1");
        let second = fetch.get("a");

        assert_eq!(first.text().await.expect("first"), "http://h/a?x=1");
        assert_eq!(second.text().await.expect("second"), "http://h/a");
    }

    #[tokio::test]
    async fn headers_append_and_replace() {
        let (fetch, seen) = client("http://h/");
        let fetch = fetch.with_header("x-default", "d").expect("header");
        fetch
            .get("h")
            .header("x-multi", "a")
            .header("x-multi", 2)
            .header("x-single", "a")
            .set_header("x-single", true)
            .send()
            .await;

        let seen = seen.lock().expect("lock");
        let headers = seen[0].headers();
        let multi: Vec<_> = headers
            .get_all("x-multi")
            .iter()
            .map(|v| v.to_str().expect("ascii"))
            .collect();
        assert_eq!(multi, ["a", "2"]);
        assert_eq!(headers["x-single"], "true");
        assert_eq!(headers["x-default"], "d");
    }

    #[tokio::test]
    async fn invalid_header_fails_before_transport() {
        let (fetch, seen) = client("http://h/");
        let err = fetch
            .get("h")
            .header("bad header", "v")
            .send()
            .await
            .into_outcome()
            .error
            .expect("error");
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn body_sets_content_type_once() {
        let (fetch, seen) = client("http://h/");
        fetch
            .post("users")
            .header("content-type", "text/plain")
            .json(BTreeMap::from([("name", "cc")]))
            .send()
            .await;

        let seen = seen.lock().expect("lock");
        let content_types: Vec<_> = seen[0]
            .headers()
            .get_all(CONTENT_TYPE)
            .iter()
            .map(|v| v.to_str().expect("ascii"))
            .collect();
        assert_eq!(content_types, ["application/json"]);
        assert_eq!(seen[0].body().as_ref(), br#"{"name":"cc"}"#);
    }

    #[tokio::test]
    async fn multipart_boundary_in_content_type() {
        let (fetch, seen) = client("http://h/");
        let form = Multipart::with_boundary("XYZ")
            .field("name", "cc")
            .file(Part::file("avatar", "a.png", &b"\x89PNG\r\n\x1a\n"[..]));
        fetch.post("upload").multipart(form).send().await;

        let seen = seen.lock().expect("lock");
        assert_eq!(
            seen[0].headers()[CONTENT_TYPE],
            "multipart/form-data; boundary=XYZ"
        );
    }

    #[tokio::test]
    async fn body_on_get_is_rejected() {
        let (fetch, seen) = client("http://h/");
        for method in [Method::Get, Method::Head, Method::Delete, Method::Options] {
            let err = fetch
                .request(method, "x")
                .form(Form::new([("a", 1)]))
                .bytes()
                .await
                .expect_err("body on bodiless method");
            assert!(matches!(err, Error::InvalidRequest(_)), "{method}: {err}");
        }
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn encoding_failure_is_reported() {
        let (fetch, _) = client("http://h/");
        let err = fetch
            .post("x")
            .json(BTreeMap::from([((1, 2), "pair key")]))
            .bytes()
            .await
            .expect_err("encoding");
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[tokio::test]
    async fn relative_path_without_base_is_invalid_url() {
        let fetch = Fetch::builder().transport(Echo::default()).build().expect("client");
        let err = fetch.get("user").bytes().await.expect_err("no base");
        assert!(matches!(err, Error::InvalidUrl(_)));

        let err = fetch.get("mailto:a@b").bytes().await.expect_err("not http");
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn with_interceptor_is_copy_on_write() {
        let (fetch, _) = client("http://h/");
        let tagged = fetch.clone().with_interceptor(
            Interceptor::new("tag", |ctx: Context, req: Request, next: Next| async move {
                let outcome = next.run(ctx, req).await;
                let body = [b"tag:".as_slice(), &outcome.body[..]].concat();
                outcome.with_body(body)
            })
            .expect("interceptor"),
        );

        assert!(fetch.chain().is_empty());
        assert_eq!(tagged.chain().len(), 1);
        assert_eq!(fetch.get("a").text().await.expect("plain"), "http://h/a");
        assert_eq!(tagged.get("a").text().await.expect("tagged"), "tag:http://h/a");

        let untagged = tagged.without_interceptor("tag");
        assert!(untagged.chain().is_empty());
    }

    #[tokio::test]
    async fn interceptors_see_built_request() {
        let (fetch, _) = client("http://h/");
        let fetch = fetch.with_interceptor(
            Interceptor::new("inspect", |ctx: Context, req: Request, next: Next| async move {
                assert_eq!(req.query_pairs(), [("id".to_string(), "10".to_string())]);
                assert_eq!(req.timeout(), Some(Duration::from_secs(3)));
                next.run(ctx, req).await
            })
            .expect("interceptor"),
        );

        fetch
            .get("a")
            .query("id", 10)
            .timeout(Duration::from_secs(3))
            .response()
            .await
            .expect("dispatch");
    }

    #[test]
    fn builder_rejects_bad_base_url() {
        let err = Fetch::builder()
            .base_url("not a url")
            .transport(Echo::default())
            .build()
            .expect_err("bad base");
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn debug_output() {
        let (fetch, _) = client("http://h/");
        let debug = format!("{fetch:?}");
        assert!(debug.contains("http://h/"));
        assert!(debug.contains("json"));
        assert_eq!(fetch.timeout(), Some(DEFAULT_TIMEOUT));
    }
}
