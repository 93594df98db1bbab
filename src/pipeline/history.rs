//! Response history.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::Request;

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::{Next, Stage, StageKind};
use crate::platform::BoxFuture;
use crate::response::Response;

/// The last-response slot shared between a client and its pipeline.
///
/// The slot is overwritten atomically under a mutex on every completed
/// exchange; concurrent sends race to it and the stored value is simply
/// whichever send completed last.
#[derive(Debug, Default)]
pub struct History {
    last_response: Mutex<Option<Response>>,
}

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recently recorded response, if any.
    #[must_use]
    pub fn last_response(&self) -> Option<Response> {
        self.slot().clone()
    }

    /// Records a completed exchange.
    pub(crate) fn record(&self, response: &Response) {
        *self.slot() = Some(response.clone());
    }

    // A panic inside the critical section is impossible (plain assignment and
    // clone), but recover from poisoning anyway rather than propagating it.
    fn slot(&self) -> MutexGuard<'_, Option<Response>> {
        self.last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A stage recording every completed exchange in a [`History`].
///
/// Transport failures leave the stored response untouched and propagate.
#[derive(Debug, Clone)]
pub struct RecordHistory {
    history: Arc<History>,
}

impl RecordHistory {
    /// Creates the stage around a shared history slot.
    #[must_use]
    pub fn new(history: Arc<History>) -> Self {
        Self { history }
    }
}

impl<C: HttpClient> Stage<C> for RecordHistory {
    fn kind(&self) -> StageKind {
        StageKind::History
    }

    fn handle<'a>(
        &'a self,
        request: Request<Bytes>,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, Result<Response, ApiError>> {
        Box::pin(async move {
            let response = next.run(request).await?;
            self.history.record(&response);
            tracing::trace!(status = %response.status(), "recorded response");

            Ok(response)
        })
    }
}
