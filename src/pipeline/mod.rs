//! The request pipeline.
//!
//! A [`Pipeline`] wraps an injected [`HttpClient`] in an ordered chain of
//! [`Stage`]s. Each stage may derive a new request from the one it receives,
//! call the rest of the chain through [`Next`], and inspect the outcome; the
//! chain is folded around the base sender at dispatch time, so stage order is
//! exactly insertion order, outermost first.
//!
//! Stages are identified by a [`StageKind`] tag. The pipeline holds at most
//! one stage per kind: installing a stage evicts any previous stage of the
//! same kind, which is how re-authentication and base-URL replacement work
//! without ever accumulating duplicates.
//!
//! The default chain built by [`Client`](crate::Client), outermost first:
//! error translation, history recording, redirect following, header
//! defaults, host resolution, with authentication appended innermost when
//! configured.

mod auth;
mod error_translator;
mod header_defaults;
mod history;
mod host;
mod redirect;

pub use auth::{AuthMethod, Authentication};
pub use error_translator::ErrorTranslator;
pub use header_defaults::HeaderDefaults;
pub use history::{History, RecordHistory};
pub use host::AddHost;
pub use redirect::FollowRedirects;

use std::fmt;

use bytes::Bytes;
use http::Request;
use snafu::ResultExt as _;

use crate::error::{ApiError, BoxedError, TransportSnafu};
use crate::http::{HttpClient, HttpResponse};
use crate::platform::{BoxFuture, MaybeSendSync};
use crate::response::Response;

/// Identity tags for pipeline stages.
///
/// A pipeline holds at most one stage per tag; see [`Pipeline::add_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StageKind {
    /// Raises typed errors for error-status responses.
    ErrorTranslator,
    /// Records the most recent completed exchange.
    History,
    /// Transparently follows redirect responses.
    FollowRedirects,
    /// Fills in default headers.
    HeaderDefaults,
    /// Resolves relative request paths against the base URL.
    Host,
    /// Attaches the Authorization header.
    Auth,
}

impl StageKind {
    /// A stable name for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::ErrorTranslator => "error_translator",
            StageKind::History => "history",
            StageKind::FollowRedirects => "follow_redirects",
            StageKind::HeaderDefaults => "header_defaults",
            StageKind::Host => "host",
            StageKind::Auth => "auth",
        }
    }
}

/// A composable unit of the request pipeline.
///
/// A stage receives the request and the remainder of the chain. It may
/// rewrite the request (functionally, via `into_parts`/`from_parts`, never
/// by sharing), run the remainder one or more times, and inspect or replace
/// the outcome.
pub trait Stage<C: HttpClient>: fmt::Debug + MaybeSendSync {
    /// The identity tag of this stage.
    fn kind(&self) -> StageKind;

    /// Handles the request, delegating to `next` for the rest of the chain.
    fn handle<'a>(
        &'a self,
        request: Request<Bytes>,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, Result<Response, ApiError>>;
}

/// The remainder of a stage chain, ending in the base sender.
pub struct Next<'a, C: HttpClient> {
    stages: &'a [Box<dyn Stage<C>>],
    http_client: &'a C,
}

impl<C: HttpClient> Clone for Next<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: HttpClient> Copy for Next<'_, C> {}

impl<C: HttpClient> Next<'_, C> {
    /// Runs the remaining stages and, at the end of the chain, the base
    /// sender.
    ///
    /// The innermost step materializes the sender's response (status,
    /// headers, body bytes) so stages always observe a fully-read
    /// [`Response`].
    ///
    /// # Errors
    ///
    /// [`ApiError::Transport`] when the sender fails to produce a response;
    /// otherwise whatever the remaining stages raise.
    pub async fn run(self, request: Request<Bytes>) -> Result<Response, ApiError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(
                        request,
                        Next {
                            stages: rest,
                            http_client: self.http_client,
                        },
                    )
                    .await
            }
            None => {
                tracing::debug!(method = %request.method(), uri = %request.uri(), "dispatching request");

                let response = self
                    .http_client
                    .execute(request)
                    .await
                    .map_err(BoxedError::from_err)
                    .context(TransportSnafu)?;

                let status = response.status();
                let headers = response.headers();
                let body = response
                    .body()
                    .await
                    .map_err(BoxedError::from_err)
                    .context(TransportSnafu)?;

                tracing::trace!(%status, bytes = body.len(), "response received");

                Ok(Response::new(status, headers, body))
            }
        }
    }
}

/// An ordered chain of stages around an injected base sender.
///
/// Built once per client; mutated only through the explicit stage
/// operations. Sending borrows the pipeline immutably, so concurrent sends
/// through a shared client are safe and configuration changes cannot race
/// them.
pub struct Pipeline<C: HttpClient> {
    stages: Vec<Box<dyn Stage<C>>>,
    http_client: C,
}

impl<C: HttpClient> Pipeline<C> {
    /// Creates an empty pipeline around the given sender.
    pub fn new(http_client: C) -> Self {
        Self {
            stages: Vec::new(),
            http_client,
        }
    }

    /// Installs a stage at the innermost position of the chain.
    ///
    /// Any existing stage with the same [`StageKind`] is evicted first:
    /// installing is also replacing, and the pipeline never holds two stages
    /// of one kind.
    pub fn add_stage(&mut self, stage: Box<dyn Stage<C>>) {
        self.remove_stage(stage.kind());
        self.stages.push(stage);
    }

    /// Removes the stage with the given kind, if one is installed.
    ///
    /// Returns whether a stage was removed.
    pub fn remove_stage(&mut self, kind: StageKind) -> bool {
        let before = self.stages.len();
        self.stages.retain(|stage| stage.kind() != kind);
        before != self.stages.len()
    }

    /// Whether a stage of the given kind is installed.
    #[must_use]
    pub fn has_stage(&self, kind: StageKind) -> bool {
        self.stages.iter().any(|stage| stage.kind() == kind)
    }

    /// Sends a request through the stage chain and the base sender.
    ///
    /// # Errors
    ///
    /// Whatever the stages raise: typed protocol errors from the error
    /// translator, [`ApiError::Transport`] from the base sender, and so on.
    pub async fn send(&self, request: Request<Bytes>) -> Result<Response, ApiError> {
        Next {
            stages: &self.stages,
            http_client: &self.http_client,
        }
        .run(request)
        .await
    }

    /// The injected base sender.
    pub fn http_client(&self) -> &C {
        &self.http_client
    }
}

impl<C: HttpClient> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::test_util::{MockResponse, MockSender};

    fn request(uri: &str) -> Request<Bytes> {
        let (mut parts, ()) = Request::new(()).into_parts();
        parts.uri = uri.parse().unwrap();
        Request::from_parts(parts, Bytes::new())
    }

    #[test]
    fn add_stage_evicts_the_previous_stage_of_the_same_kind() {
        let mut pipeline = Pipeline::new(MockSender::empty_script());

        pipeline.add_stage(Box::new(ErrorTranslator::new()));
        pipeline.add_stage(Box::new(ErrorTranslator::new()));

        assert_eq!(
            pipeline
                .stages
                .iter()
                .filter(|s| s.kind() == StageKind::ErrorTranslator)
                .count(),
            1
        );
    }

    #[test]
    fn remove_stage_reports_whether_anything_was_removed() {
        let mut pipeline = Pipeline::new(MockSender::empty_script());
        pipeline.add_stage(Box::new(ErrorTranslator::new()));

        assert!(pipeline.remove_stage(StageKind::ErrorTranslator));
        assert!(!pipeline.remove_stage(StageKind::ErrorTranslator));
        assert!(!pipeline.has_stage(StageKind::ErrorTranslator));
    }

    #[tokio::test]
    async fn an_empty_pipeline_materializes_the_sender_response() {
        let sender = MockSender::respond(MockResponse::json(200, r#"{"ok":true}"#));
        let pipeline = Pipeline::new(sender.clone());

        let response = pipeline
            .send(request("https://api.example.com/ping"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#"{"ok":true}"#);
        assert_eq!(sender.request_count(), 1);
    }

    #[tokio::test]
    async fn sender_failures_surface_as_transport_errors() {
        let sender = MockSender::failing();
        let pipeline = Pipeline::new(sender);

        let err = pipeline
            .send(request("https://api.example.com/ping"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport { .. }), "{err}");
    }
}
