//! Redirect following.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{Method, Request, StatusCode, Uri};

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::{Next, Stage, StageKind};
use crate::platform::BoxFuture;
use crate::response::Response;

const DEFAULT_MAX_REDIRECTS: usize = 10;

const REDIRECT_STATUSES: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// A stage transparently following redirect responses.
///
/// `307`/`308` re-issue the request unchanged. `301`/`302`/`303` downgrade
/// non-GET/HEAD methods to GET and drop the body. Absolute `Location` values
/// replace the request URI; relative ones replace only the path and query,
/// so the rewritten request flows through the rest of the chain (and the
/// host stage) again. A redirect response without a `Location` header passes
/// through unchanged.
#[derive(Debug, Clone)]
pub struct FollowRedirects {
    max_redirects: usize,
}

impl FollowRedirects {
    /// Creates the stage with the default hop limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Creates the stage with a custom hop limit.
    #[must_use]
    pub fn with_max_redirects(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl Default for FollowRedirects {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: HttpClient> Stage<C> for FollowRedirects {
    fn kind(&self) -> StageKind {
        StageKind::FollowRedirects
    }

    fn handle<'a>(
        &'a self,
        request: Request<Bytes>,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, Result<Response, ApiError>> {
        Box::pin(async move {
            let (mut parts, mut body) = request.into_parts();
            let mut hops = 0;

            loop {
                let attempt = rebuild(&parts, &body);
                let response = next.run(attempt).await?;
                let status = response.status();

                if !REDIRECT_STATUSES.contains(&status) {
                    return Ok(response);
                }

                let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                else {
                    return Ok(response);
                };

                hops += 1;
                if hops > self.max_redirects {
                    return Err(ApiError::Runtime {
                        message: format!("Stopped after {} redirects.", self.max_redirects),
                    });
                }

                let target = location.parse::<Uri>().map_err(|e| ApiError::Runtime {
                    message: format!("Invalid redirect location \"{location}\": {e}"),
                })?;

                tracing::debug!(%status, location, hops, "following redirect");

                parts.uri = merge_location(&parts.uri, target)?;

                if matches!(
                    status,
                    StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
                ) && parts.method != Method::GET
                    && parts.method != Method::HEAD
                {
                    parts.method = Method::GET;
                    parts.headers.remove(CONTENT_TYPE);
                    body = Bytes::new();
                }
            }
        })
    }
}

/// Derives a fresh request from the retained parts; the body is
/// reference-counted, so this is cheap.
fn rebuild(parts: &http::request::Parts, body: &Bytes) -> Request<Bytes> {
    let (mut fresh, ()) = Request::new(()).into_parts();
    fresh.method = parts.method.clone();
    fresh.uri = parts.uri.clone();
    fresh.headers = parts.headers.clone();

    Request::from_parts(fresh, body.clone())
}

/// Resolves a `Location` value against the URI it redirects from.
fn merge_location(current: &Uri, target: Uri) -> Result<Uri, ApiError> {
    // A full URL replaces the request target outright.
    if target.scheme().is_some() {
        return Ok(target);
    }

    let mut parts = if target.authority().is_some() {
        // Protocol-relative: keep the current scheme.
        let mut parts = target.into_parts();
        parts.scheme = current.scheme().cloned();
        parts
    } else {
        // Path-relative: keep scheme and authority, swap path and query.
        let mut parts = current.clone().into_parts();
        parts.path_and_query = target.path_and_query().cloned();
        parts
    };

    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(http::uri::PathAndQuery::from_static("/"));
    }

    Uri::from_parts(parts).map_err(|e| ApiError::Runtime {
        message: format!("Invalid redirect location: {e}"),
    })
}
