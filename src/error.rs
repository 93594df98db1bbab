//! Error types and the [`Error`] trait.
//!
//! All errors in this library implement the [`Error`] trait, which extends
//! [`std::error::Error`] with retry semantics. [`BoxedError`] provides
//! type-erased error handling while preserving retryability. [`ApiError`] is
//! the error surfaced by the client: one variant per failure kind, carrying
//! the originating status code where one exists.

use std::convert::Infallible;

use http::StatusCode;
use snafu::{AsErrorSource, Snafu};

use crate::platform::MaybeSendSync;

/// Errors that may occur in the library.
pub trait Error: std::error::Error + AsErrorSource + MaybeSendSync + 'static {
    /// If true, this indicates that a failed request may succeed if retried.
    fn is_retryable(&self) -> bool;
}

impl Error for Infallible {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// A boxed error that can be used without type parameters.
#[derive(Debug, Snafu)]
#[snafu(transparent)]
pub struct BoxedError {
    source: Box<dyn Error>,
}

impl BoxedError {
    /// Create a new boxed error from a generic `Error`.
    pub fn from_err<E: Error + 'static>(err: E) -> Self {
        Self {
            source: Box::new(err),
        }
    }
}

impl Error for BoxedError {
    fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// Limit reported for a rate-limited response that does not state one.
pub(crate) const DEFAULT_RATE_LIMIT: u64 = 5000;

/// Reset window, in seconds, reported when the server does not state one.
pub(crate) const DEFAULT_RATE_LIMIT_RESET: u64 = 1800;

/// The error raised by the client when a request cannot be completed.
///
/// Every failure surfaces as exactly one of these variants: protocol-level
/// rejections carry the originating status code, [`RateLimitExceeded`] carries
/// the numeric limit and reset window so callers can implement their own
/// backoff, and [`Transport`] wraps whatever the injected sender raised when
/// no response was obtained at all.
///
/// [`RateLimitExceeded`]: ApiError::RateLimitExceeded
/// [`Transport`]: ApiError::Transport
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ApiError {
    /// The server rejected the request as malformed (status 400).
    #[snafu(display("Bad request: {message}"))]
    BadRequest {
        /// The error message reported by the server.
        message: String,
        /// The originating status code.
        status: StatusCode,
    },

    /// The server rejected the request content (status 422).
    #[snafu(display("Validation failed: {message}"))]
    ValidationFailed {
        /// The error message reported by the server.
        message: String,
        /// The originating status code.
        status: StatusCode,
    },

    /// A rate limit has been reached.
    #[snafu(display("{message} (limit {limit}, resets in {reset}s)"))]
    RateLimitExceeded {
        /// The error message reported by the server, or a generated one when
        /// the limit was detected from a rate-limit header.
        message: String,
        /// The limit in force.
        limit: u64,
        /// Seconds until the limit resets.
        reset: u64,
        /// The originating status code, if the limit was reported through one.
        status: Option<StatusCode>,
    },

    /// The server answered with a 4xx status not covered by a more specific kind.
    #[snafu(display("Client error {status}: {message}"))]
    ClientError {
        /// The error message reported by the server.
        message: String,
        /// The originating status code.
        status: StatusCode,
    },

    /// The server answered with a 5xx status.
    #[snafu(display("Server error {status}: {message}"))]
    ServerError {
        /// The error message reported by the server.
        message: String,
        /// The originating status code.
        status: StatusCode,
    },

    /// The response body could not be interpreted as the expected JSON shape.
    #[snafu(display("Failed to decode the response body: {message}"))]
    DecodingFailed {
        /// The content-type or parser diagnostic.
        message: String,
    },

    /// The underlying HTTP transport failed before a response was obtained.
    #[snafu(display("HTTP transport failed"))]
    Transport {
        /// The error raised by the injected sender.
        source: BoxedError,
    },

    /// An operation was requested that the client does not implement.
    #[snafu(display("{message}"))]
    Runtime {
        /// What was attempted.
        message: String,
    },

    /// A caller-supplied argument was rejected.
    #[snafu(display("{message}"))]
    InvalidArgument {
        /// Which argument, and why.
        message: String,
    },
}

impl ApiError {
    /// The status code of the response this error was translated from, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::BadRequest { status, .. }
            | ApiError::ValidationFailed { status, .. }
            | ApiError::ClientError { status, .. }
            | ApiError::ServerError { status, .. } => Some(*status),
            ApiError::RateLimitExceeded { status, .. } => *status,
            ApiError::DecodingFailed { .. }
            | ApiError::Transport { .. }
            | ApiError::Runtime { .. }
            | ApiError::InvalidArgument { .. } => None,
        }
    }

    /// A rate limit detected from the `X-RateLimit-Remaining` header.
    pub(crate) fn rate_limit_reached(remaining: u64) -> Self {
        ApiError::RateLimitExceeded {
            message: format!("You have reached the hourly request limit! Actual limit is: {remaining}"),
            limit: remaining,
            reset: DEFAULT_RATE_LIMIT_RESET,
            status: None,
        }
    }
}

impl Error for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::ServerError { .. } | ApiError::RateLimitExceeded { .. } => true,
            ApiError::Transport { source } => source.is_retryable(),
            ApiError::BadRequest { .. }
            | ApiError::ValidationFailed { .. }
            | ApiError::ClientError { .. }
            | ApiError::DecodingFailed { .. }
            | ApiError::Runtime { .. }
            | ApiError::InvalidArgument { .. } => false,
        }
    }
}
