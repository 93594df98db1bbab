//! Base-URL resolution.

use bytes::Bytes;
use http::{Request, Uri};

use crate::base_url::BaseUrl;
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::{Next, Stage, StageKind};
use crate::platform::BoxFuture;
use crate::response::Response;

/// A stage rewriting relative request paths into absolute URLs.
///
/// Requests that already carry an authority pass through untouched; anything
/// else is resolved under the configured [`BaseUrl`], including the base's
/// own path prefix. Joining never drops or doubles the separator between the
/// base path and the request path.
#[derive(Debug, Clone)]
pub struct AddHost {
    base: BaseUrl,
}

impl AddHost {
    /// Creates the stage from a validated base URL.
    #[must_use]
    pub fn new(base: BaseUrl) -> Self {
        Self { base }
    }
}

impl<C: HttpClient> Stage<C> for AddHost {
    fn kind(&self) -> StageKind {
        StageKind::Host
    }

    fn handle<'a>(
        &'a self,
        request: Request<Bytes>,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, Result<Response, ApiError>> {
        Box::pin(async move {
            if request.uri().authority().is_some() {
                return next.run(request).await;
            }

            let (mut parts, body) = request.into_parts();
            parts.uri = resolve(&self.base, &parts.uri)?;

            next.run(Request::from_parts(parts, body)).await
        })
    }
}

fn resolve(base: &BaseUrl, relative: &Uri) -> Result<Uri, ApiError> {
    let base_path = base.as_uri().path().trim_end_matches('/');
    let tail = relative
        .path_and_query()
        .map_or("/", http::uri::PathAndQuery::as_str)
        .trim_start_matches('/');

    let joined = format!("{base_path}/{tail}");

    let mut parts = base.as_uri().clone().into_parts();
    parts.path_and_query = Some(joined.parse().map_err(|e| ApiError::InvalidArgument {
        message: format!("Invalid request path \"{joined}\": {e}"),
    })?);

    Uri::from_parts(parts).map_err(|e| ApiError::InvalidArgument {
        message: format!("Cannot resolve request against the base URL: {e}"),
    })
}
