//! The terminal handler: the only step of a dispatch that touches the network.

use std::sync::Arc;

use bytes::Bytes;
use fetchkit_core::{BoxFuture, Context, Error, Handler, Outcome, Request, Response, Result};
use http_body_util::{BodyExt, Full};

use crate::{Transport, debug};

/// Sends the request through a [`Transport`] and drains the response body
/// exactly once.
///
/// The exchange (send and drain) is bounded by the context deadline and
/// aborted by the context's cancellation token.
pub(crate) struct Terminal {
    transport: Arc<dyn Transport>,
    debug: bool,
}

impl Terminal {
    pub(crate) fn new(transport: Arc<dyn Transport>, debug: bool) -> Self {
        Self { transport, debug }
    }

    async fn exchange(&self, ctx: Context, request: Request) -> Outcome {
        if self.debug {
            debug::dump_request(&request);
        }

        let http_request = match into_http_request(request) {
            Ok(http_request) => http_request,
            Err(error) => return Outcome::from_error(error),
        };

        let exchanged = ctx
            .run(async {
                let response = self.transport.send(http_request).await?;
                let (parts, body) = response.into_parts();
                let body = body.collect().await?.to_bytes();
                Ok::<_, Error>((parts, body))
            })
            .await
            .and_then(std::convert::identity);

        match exchanged {
            Ok((parts, body)) => {
                let response =
                    Response::new(parts.status.as_u16(), parts.headers).with_version(parts.version);
                if self.debug {
                    debug::dump_response(&response, &body);
                }
                Outcome::new(response, body)
            }
            Err(error) => Outcome::from_error(error),
        }
    }
}

impl Handler for Terminal {
    fn handle<'a>(&'a self, ctx: Context, request: Request) -> BoxFuture<'a, Outcome> {
        Box::pin(self.exchange(ctx, request))
    }
}

fn into_http_request(request: Request) -> Result<http::Request<Full<Bytes>>> {
    let (method, url, headers, body) = request.into_parts();

    let mut builder = http::Request::builder()
        .method(http::Method::from(method))
        .uri(url.as_str());
    if let Some(target) = builder.headers_mut() {
        *target = headers;
    }

    builder
        .body(body.map_or_else(Full::default, Full::new))
        .map_err(|e| Error::invalid_request(e.to_string()))
}
