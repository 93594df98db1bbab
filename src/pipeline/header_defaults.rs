//! Default request headers.

use bytes::Bytes;
use http::header::{ACCEPT, USER_AGENT};
use http::{HeaderMap, HeaderValue, Request};

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::{Next, Stage, StageKind};
use crate::platform::BoxFuture;
use crate::response::Response;

/// A stage filling in default headers on requests that lack them.
///
/// Headers already set on a request always win; the stage never overwrites.
#[derive(Debug, Clone)]
pub struct HeaderDefaults {
    defaults: HeaderMap,
}

impl HeaderDefaults {
    /// The standard defaults: `Accept: application/json` and the crate's
    /// user agent.
    #[must_use]
    pub fn new() -> Self {
        let mut defaults = HeaderMap::new();
        defaults.insert(ACCEPT, HeaderValue::from_static("application/json"));
        defaults.insert(USER_AGENT, HeaderValue::from_static(crate::USER_AGENT));
        Self { defaults }
    }

    /// A stage applying an arbitrary set of defaults.
    #[must_use]
    pub fn from_headers(defaults: HeaderMap) -> Self {
        Self { defaults }
    }
}

impl Default for HeaderDefaults {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: HttpClient> Stage<C> for HeaderDefaults {
    fn kind(&self) -> StageKind {
        StageKind::HeaderDefaults
    }

    fn handle<'a>(
        &'a self,
        request: Request<Bytes>,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, Result<Response, ApiError>> {
        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            for (name, value) in &self.defaults {
                if !parts.headers.contains_key(name) {
                    parts.headers.insert(name, value.clone());
                }
            }

            next.run(Request::from_parts(parts, body)).await
        })
    }
}
