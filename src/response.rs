//! The materialized HTTP response and its JSON decoding rules.
//!
//! The pipeline reads the injected sender's response fully into a
//! [`Response`] (status, headers, body bytes) before any stage inspects it.
//! [`Response::decode`] turns the body into JSON, enforcing the content-type
//! and shape rules of the remote API; [`Response::rate_limit_remaining`] is a
//! separate check consulted by the error-translation stage.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::error::ApiError;

/// The rate-limit header set by the remote API.
const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";

/// A fully-read HTTP response.
///
/// Cheap to clone: the body is reference-counted [`Bytes`].
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Creates a response from its raw parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decodes the response body as a JSON collection.
    ///
    /// A `204 No Content` response, or any response with an empty body,
    /// decodes to the empty object. Any other body must be declared as
    /// `application/json` and parse to a top-level array or object.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::DecodingFailed`] with the content-type or parser
    /// diagnostic when the body cannot be interpreted.
    pub fn decode(&self) -> Result<Value, ApiError> {
        if self.status == StatusCode::NO_CONTENT || self.body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if !content_type.starts_with("application/json") {
            return Err(ApiError::DecodingFailed {
                message: "the content type header was not application/json".to_owned(),
            });
        }

        let value: Value =
            serde_json::from_slice(&self.body).map_err(|e| ApiError::DecodingFailed {
                message: e.to_string(),
            })?;

        if !value.is_object() && !value.is_array() {
            return Err(ApiError::DecodingFailed {
                message: "expected the body to decode to an array or object".to_owned(),
            });
        }

        Ok(value)
    }

    /// Reads the remaining call count from the `X-RateLimit-Remaining` header.
    ///
    /// Absent or unparseable headers yield `Ok(None)`. This is deliberately
    /// separate from [`decode`](Self::decode): the error-translation stage
    /// runs it once per exchange.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RateLimitExceeded`], carrying the remaining count
    /// as the limit, when the header reports fewer than one call left.
    pub fn rate_limit_remaining(&self) -> Result<Option<u64>, ApiError> {
        let Some(value) = self.headers.get(RATE_LIMIT_REMAINING) else {
            return Ok(None);
        };

        let Some(remaining) = value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        else {
            return Ok(None);
        };

        if remaining < 1 {
            return Err(ApiError::rate_limit_reached(remaining));
        }

        Ok(Some(remaining))
    }
}
