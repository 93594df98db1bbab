//! Resource clients and their shared request plumbing.
//!
//! Each remote resource is exposed as a thin client borrowing the request
//! pipeline from the [`Client`](crate::Client). The [`ApiResource`] trait
//! provides the request helpers resources are built from: query encoding for
//! GET, JSON encoding for mutating verbs, and response decoding on the way
//! back. [`build_path`] escapes caller-supplied path segments.

mod users;

pub use users::Users;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Uri};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::Pipeline;
use crate::platform::{MaybeSend, MaybeSendSync, MaybeSync};
use crate::response::Response;

/// Path-segment escape set: everything but unreserved characters.
///
/// `.` is deliberately not exempt, so a literal dot always encodes as `%2E`
/// and a segment value can never collide with path navigation.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'~');

/// Builds a URL path from the given segments.
///
/// Every segment is percent-encoded for path safety and the segments are
/// joined with `/`.
///
/// # Errors
///
/// Returns [`ApiError::InvalidArgument`] if any segment is empty.
pub fn build_path<I>(segments: I) -> Result<String, ApiError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut encoded = Vec::new();
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() {
            return Err(ApiError::InvalidArgument {
                message: "Missing required parameter.".to_owned(),
            });
        }

        encoded.push(utf8_percent_encode(segment, PATH_SEGMENT).to_string());
    }

    Ok(encoded.join("/"))
}

/// Shared request helpers for resource clients.
///
/// A resource only needs to name the pipeline it dispatches through; the
/// provided methods build the request, send it, and decode the response per
/// the remote API's JSON rules. Mutating verbs take an optional body: `None`
/// sends no body and no content type, `Some` sends it JSON-encoded with
/// `Content-Type: application/json`.
pub trait ApiResource<C: HttpClient>: MaybeSendSync {
    /// The pipeline requests are dispatched through.
    fn pipeline(&self) -> &Pipeline<C>;

    /// Sends a GET request with query parameters and decodes the response.
    fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> impl Future<Output = Result<Value, ApiError>> + MaybeSend {
        async move {
            let request = build_request(Method::GET, build_uri(path, params)?, None);
            self.pipeline().send(request).await?.decode()
        }
    }

    /// Sends a POST request with an optional JSON-encoded body.
    fn post<B: Serialize + MaybeSync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> impl Future<Output = Result<Value, ApiError>> + MaybeSend {
        async move {
            let request = build_request(Method::POST, build_uri(path, &[])?, encode_body(body)?);
            self.pipeline().send(request).await?.decode()
        }
    }

    /// Sends a PUT request with an optional JSON-encoded body.
    fn put<B: Serialize + MaybeSync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> impl Future<Output = Result<Value, ApiError>> + MaybeSend {
        async move {
            let request = build_request(Method::PUT, build_uri(path, &[])?, encode_body(body)?);
            self.pipeline().send(request).await?.decode()
        }
    }

    /// Sends a DELETE request with an optional JSON-encoded body.
    fn delete<B: Serialize + MaybeSync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> impl Future<Output = Result<Value, ApiError>> + MaybeSend {
        async move {
            let request = build_request(Method::DELETE, build_uri(path, &[])?, encode_body(body)?);
            self.pipeline().send(request).await?.decode()
        }
    }

    /// Sends a GET request and returns the raw [`Response`] without decoding.
    fn get_response(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> impl Future<Output = Result<Response, ApiError>> + MaybeSend {
        async move {
            let request = build_request(Method::GET, build_uri(path, params)?, None);
            self.pipeline().send(request).await
        }
    }
}

fn build_uri(path: &str, params: &[(&str, &str)]) -> Result<Uri, ApiError> {
    let path_and_query = if params.is_empty() {
        path.to_owned()
    } else {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        format!("{path}?{query}")
    };

    path_and_query
        .parse::<Uri>()
        .map_err(|e| ApiError::InvalidArgument {
            message: format!("Invalid request path \"{path_and_query}\": {e}"),
        })
}

fn build_request(method: Method, uri: Uri, body: Option<Bytes>) -> Request<Bytes> {
    let (mut parts, ()) = Request::new(()).into_parts();
    parts.method = method;
    parts.uri = uri;

    let body = match body {
        Some(bytes) => {
            parts
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            bytes
        }
        None => Bytes::new(),
    };

    Request::from_parts(parts, body)
}

fn encode_body<B: Serialize>(body: Option<&B>) -> Result<Option<Bytes>, ApiError> {
    body.map(|b| {
        serde_json::to_vec(b)
            .map(Bytes::from)
            .map_err(|e| ApiError::InvalidArgument {
                message: format!("Failed to encode the request body as JSON: {e}"),
            })
    })
    .transpose()
}
