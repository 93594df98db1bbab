//! A scripted sender for exercising the pipeline without a network.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use snafu::Snafu;

use crate::http::{HttpClient, HttpResponse};

/// The transport error produced by a scripted failure.
#[derive(Debug, Snafu)]
#[snafu(display("scripted transport failure"))]
pub(crate) struct ScriptedFailure;

impl crate::Error for ScriptedFailure {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// A request observed by the mock sender.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A canned response returned by the mock sender.
#[derive(Debug)]
pub(crate) struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl MockResponse {
    pub fn empty(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        let mut response = Self::empty(status);
        response.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response.body = Bytes::copy_from_slice(body.as_bytes());
        response
    }

    pub fn with_body(status: u16, content_type: &str, body: &str) -> Self {
        let mut response = Self::empty(status);
        response.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type).expect("valid content type"),
        );
        response.body = Bytes::copy_from_slice(body.as_bytes());
        response
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers
            .insert(name, HeaderValue::from_str(value).expect("valid header"));
        self
    }
}

impl HttpResponse for MockResponse {
    type Error = Infallible;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    async fn body(self) -> Result<Bytes, Self::Error> {
        Ok(self.body)
    }
}

#[derive(Debug, Default)]
struct MockInner {
    script: Mutex<VecDeque<Result<MockResponse, ScriptedFailure>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A scripted [`HttpClient`].
///
/// Clones share the script and the recorded requests, so a handle kept
/// outside the client can observe what the pipeline sent.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockSender {
    inner: Arc<MockInner>,
}

impl MockSender {
    /// A sender whose script will be fed with [`push`](Self::push).
    pub fn empty_script() -> Self {
        Self::default()
    }

    /// A sender answering every request in order with the given outcomes.
    pub fn with_script(
        script: impl IntoIterator<Item = Result<MockResponse, ScriptedFailure>>,
    ) -> Self {
        let sender = Self::default();
        for outcome in script {
            sender.push(outcome);
        }
        sender
    }

    /// A sender answering a single request with the given response.
    pub fn respond(response: MockResponse) -> Self {
        Self::with_script([Ok(response)])
    }

    /// A sender failing its next request at the transport level.
    pub fn failing() -> Self {
        Self::with_script([Err(ScriptedFailure)])
    }

    pub fn push(&self, outcome: Result<MockResponse, ScriptedFailure>) {
        self.inner
            .script
            .lock()
            .expect("mock script lock")
            .push_back(outcome);
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().expect("mock request lock").len()
    }

    /// The requests observed so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner
            .requests
            .lock()
            .expect("mock request lock")
            .clone()
    }

    /// The most recent request observed.
    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }
}

impl HttpClient for MockSender {
    type Error = ScriptedFailure;
    type Response = MockResponse;

    async fn execute(&self, request: Request<Bytes>) -> Result<MockResponse, ScriptedFailure> {
        let (parts, body) = request.into_parts();
        self.inner
            .requests
            .lock()
            .expect("mock request lock")
            .push(RecordedRequest {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
            });

        self.inner
            .script
            .lock()
            .expect("mock script lock")
            .pop_front()
            .expect("mock script exhausted")
    }
}
