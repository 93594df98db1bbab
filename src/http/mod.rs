//! HTTP sender abstractions.
//!
//! This module defines the traits that decouple the library from any specific
//! HTTP implementation. Users inject their own [`HttpClient`] (e.g. backed by
//! `reqwest`, `hyper`, or a WASM-compatible client) at client construction,
//! and the request pipeline operates against these traits. The sender is the
//! innermost capability of the pipeline: it performs exactly one network
//! exchange per call, with whatever timeout policy it was configured with.

#[cfg(all(not(target_arch = "wasm32"), feature = "http-client-reqwest-0_13"))]
mod reqwest_0_13;

use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};

use crate::platform::{MaybeSend, MaybeSendSync};

/// Defines the common interface for HTTP requests.
pub trait HttpClient: MaybeSendSync {
    /// The error type returned by the client for a failed request.
    type Error: crate::Error;

    /// The associated response type returned by this HTTP client.
    type Response: HttpResponse;

    /// Executes an HTTP request and returns an owned response.
    ///
    /// The request body is provided as [`Bytes`]. Implementations must not
    /// retry: a failed exchange surfaces as `Self::Error` and the caller
    /// decides what to do with it.
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + MaybeSend;
}

/// Defines the common interface for HTTP responses.
pub trait HttpResponse: MaybeSendSync {
    /// The error type when getting the response body.
    type Error: crate::Error;

    /// Returns the HTTP status code of the response.
    fn status(&self) -> StatusCode;

    /// Returns the response's HTTP headers.
    fn headers(&self) -> HeaderMap;

    /// Consumes the response and asynchronously returns its body as [`Bytes`].
    fn body(self) -> impl Future<Output = Result<Bytes, Self::Error>> + MaybeSend;
}
