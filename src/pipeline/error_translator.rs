//! Translation of error-status responses into typed errors.

use bytes::Bytes;
use http::{Request, StatusCode};

use crate::error::{ApiError, DEFAULT_RATE_LIMIT, DEFAULT_RATE_LIMIT_RESET};
use crate::http::HttpClient;
use crate::pipeline::{Next, Stage, StageKind};
use crate::platform::BoxFuture;
use crate::response::Response;

/// A stage raising a typed error for every error-status response.
///
/// Runs outermost, so no response with status 400 or above ever escapes the
/// pipeline as a value. The error message is taken from the `error` field of
/// the decoded body when there is one; a body that cannot be decoded
/// degrades silently to the status's canonical reason phrase.
///
/// For successful statuses the stage consults the rate-limit header (see
/// [`Response::rate_limit_remaining`]) before passing the response through
/// unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<C: HttpClient> Stage<C> for ErrorTranslator {
    fn kind(&self) -> StageKind {
        StageKind::ErrorTranslator
    }

    fn handle<'a>(
        &'a self,
        request: Request<Bytes>,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, Result<Response, ApiError>> {
        Box::pin(async move {
            let response = next.run(request).await?;
            let status = response.status();

            if status.is_client_error() || status.is_server_error() {
                let message =
                    extract_message(&response).unwrap_or_else(|| reason_phrase(status));
                tracing::debug!(%status, "translating error response");
                return Err(error_for_status(status, message));
            }

            response.rate_limit_remaining()?;

            Ok(response)
        })
    }
}

/// The `error` field of the decoded body, if the body decodes to a
/// collection carrying one.
fn extract_message(response: &Response) -> Option<String> {
    let value = response.decode().ok()?;
    value.get("error")?.as_str().map(str::to_owned)
}

fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("unknown status").to_owned()
}

fn error_for_status(status: StatusCode, message: String) -> ApiError {
    match status {
        StatusCode::BAD_REQUEST => ApiError::BadRequest { message, status },
        StatusCode::UNPROCESSABLE_ENTITY => ApiError::ValidationFailed { message, status },
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimitExceeded {
            message,
            limit: DEFAULT_RATE_LIMIT,
            reset: DEFAULT_RATE_LIMIT_RESET,
            status: Some(status),
        },
        _ if status.is_client_error() => ApiError::ClientError { message, status },
        _ => ApiError::ServerError { message, status },
    }
}
