//! The API client facade.

use std::fmt;
use std::sync::Arc;

use bon::bon;

use crate::api::Users;
use crate::base_url::{BaseUrl, IntoBaseUrl};
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::{
    AddHost, AuthMethod, Authentication, ErrorTranslator, FollowRedirects, HeaderDefaults,
    History, Pipeline, RecordHistory,
};
use crate::response::Response;

/// The base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.sendibod.dev";

/// The user agent attached to every request.
pub const USER_AGENT: &str = "sendibod-rs-client";

/// The Sendibod API client.
///
/// Owns the request pipeline and the response history. Requests go out
/// through the pipeline's stage chain (error translation, history
/// recording, redirect following, header defaults, host resolution, and,
/// once configured, authentication) and come back decoded or as a typed
/// [`ApiError`].
///
/// Sending borrows the client immutably, so one client can serve concurrent
/// callers; reconfiguration ([`authenticate`](Self::authenticate),
/// [`set_base_url`](Self::set_base_url)) takes `&mut self` and therefore
/// cannot race in-flight requests.
pub struct Client<C: HttpClient> {
    pipeline: Pipeline<C>,
    history: Arc<History>,
}

#[bon]
impl<C: HttpClient> Client<C> {
    /// Creates a client around an injected HTTP sender.
    #[builder(start_fn = builder, finish_fn = build)]
    pub fn assemble(
        #[builder(start_fn)] http_client: C,
        /// The base URL requests are resolved against.
        #[builder(default = BaseUrl::from_static(DEFAULT_BASE_URL))]
        base_url: BaseUrl,
    ) -> Self {
        let history = Arc::new(History::new());

        let mut pipeline = Pipeline::new(http_client);
        pipeline.add_stage(Box::new(ErrorTranslator::new()));
        pipeline.add_stage(Box::new(RecordHistory::new(Arc::clone(&history))));
        pipeline.add_stage(Box::new(FollowRedirects::new()));
        pipeline.add_stage(Box::new(HeaderDefaults::new()));
        pipeline.add_stage(Box::new(AddHost::new(base_url)));

        Self { pipeline, history }
    }
}

impl<C: HttpClient> Client<C> {
    /// Creates a client with the default configuration.
    pub fn new(http_client: C) -> Self {
        Client::builder(http_client).build()
    }

    /// The users resource.
    #[must_use]
    pub fn users(&self) -> Users<'_, C> {
        Users::new(&self.pipeline)
    }

    /// Looks up a resource client by its symbolic name.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidArgument`] for unknown names.
    pub fn api(&self, name: &str) -> Result<Api<'_, C>, ApiError> {
        match name {
            "user" | "users" => Ok(Api::Users(self.users())),
            other => Err(ApiError::InvalidArgument {
                message: format!("Undefined api instance called: \"{other}\"."),
            }),
        }
    }

    /// Authenticates all subsequent requests.
    ///
    /// Replaces any previously configured authentication; the pipeline never
    /// holds more than one authentication stage.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidArgument`] if the credentials do not form
    /// a valid header value.
    pub fn authenticate(
        &mut self,
        method: AuthMethod,
        token: &str,
        password: Option<&str>,
    ) -> Result<(), ApiError> {
        let stage = Authentication::new(method, token, password)?;
        self.pipeline.add_stage(Box::new(stage));

        Ok(())
    }

    /// Replaces the base URL requests are resolved against.
    ///
    /// # Errors
    ///
    /// Whatever the URL conversion raises; see [`IntoBaseUrl`].
    pub fn set_base_url<U: IntoBaseUrl>(&mut self, url: U) -> Result<(), U::Error> {
        let base = url.into_base_url()?;
        self.pipeline.add_stage(Box::new(AddHost::new(base)));

        Ok(())
    }

    /// The most recent completed exchange, if any.
    ///
    /// Reflects some completed send; under concurrent use the winner is
    /// whichever send completed last. Error-status responses are recorded
    /// too: they complete the exchange even though the error translator
    /// then raises.
    #[must_use]
    pub fn last_response(&self) -> Option<Response> {
        self.history.last_response()
    }

    /// The pipeline dispatching this client's requests.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline<C> {
        &self.pipeline
    }

    /// Mutable pipeline access, for installing custom stages.
    pub fn pipeline_mut(&mut self) -> &mut Pipeline<C> {
        &mut self.pipeline
    }
}

impl<C: HttpClient> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// A resource client resolved by name through [`Client::api`].
#[non_exhaustive]
pub enum Api<'c, C: HttpClient> {
    /// The users resource.
    Users(Users<'c, C>),
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{ACCEPT, AUTHORIZATION, USER_AGENT as USER_AGENT_HEADER};

    use super::*;
    use crate::test_util::{MockResponse, MockSender, ScriptedFailure};

    #[tokio::test]
    async fn me_fetches_the_current_user_from_the_default_host() {
        let sender = MockSender::respond(MockResponse::json(200, r#"{"username":"ada"}"#));
        let client = Client::new(sender.clone());

        let me = client.users().me().await.unwrap();
        assert_eq!(me["username"], "ada");

        let sent = sender.last_request();
        assert_eq!(sent.method, http::Method::GET);
        assert_eq!(sent.uri.to_string(), "https://api.sendibod.dev/user");
        assert_eq!(sent.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(sent.headers.get(USER_AGENT_HEADER).unwrap(), USER_AGENT);
    }

    #[tokio::test]
    async fn authenticate_attaches_the_authorization_header() {
        let sender = MockSender::respond(MockResponse::json(200, "{}"));
        let mut client = Client::new(sender.clone());
        client
            .authenticate(AuthMethod::OAuthToken, "T", None)
            .unwrap();

        client.users().me().await.unwrap();

        let sent = sender.last_request();
        assert_eq!(sent.headers.get(AUTHORIZATION).unwrap(), "Bearer T");
    }

    #[tokio::test]
    async fn authenticating_twice_keeps_exactly_one_header_from_the_second_config() {
        let sender = MockSender::respond(MockResponse::json(200, "{}"));
        let mut client = Client::new(sender.clone());
        client
            .authenticate(AuthMethod::OAuthToken, "stale", None)
            .unwrap();
        client
            .authenticate(AuthMethod::HttpPassword, "u", Some("p"))
            .unwrap();

        client.users().me().await.unwrap();

        let sent = sender.last_request();
        let values: Vec<_> = sent.headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Basic dTpw");
    }

    #[tokio::test]
    async fn set_base_url_moves_subsequent_requests() {
        let sender = MockSender::respond(MockResponse::json(200, "{}"));
        let mut client = Client::new(sender.clone());
        client.set_base_url("https://staging.example.com/v2").unwrap();

        client.users().me().await.unwrap();

        assert_eq!(
            sender.last_request().uri.to_string(),
            "https://staging.example.com/v2/user"
        );
    }

    #[test]
    fn builder_accepts_a_custom_base_url() {
        use crate::base_url::IntoBaseUrl as _;

        let client = Client::builder(MockSender::empty_script())
            .base_url("https://eu.example.com".into_base_url().unwrap())
            .build();
        assert!(client.last_response().is_none());
    }

    #[test]
    fn unknown_resource_names_are_rejected() {
        let client = Client::new(MockSender::empty_script());

        assert!(matches!(client.api("user"), Ok(Api::Users(_))));
        assert!(matches!(client.api("users"), Ok(Api::Users(_))));

        match client.api("payments") {
            Err(ApiError::InvalidArgument { message }) => {
                assert_eq!(message, "Undefined api instance called: \"payments\".");
            }
            _ => panic!("expected InvalidArgument"),
        }
    }

    #[tokio::test]
    async fn error_status_responses_raise_but_are_still_recorded() {
        let sender = MockSender::respond(MockResponse::json(
            404,
            r#"{"error":"no such user"}"#,
        ));
        let client = Client::new(sender);

        let err = client.users().me().await.unwrap_err();
        match err {
            ApiError::ClientError { message, status } => {
                assert_eq!(message, "no such user");
                assert_eq!(status, StatusCode::NOT_FOUND);
            }
            other => panic!("expected ClientError, got {other:?}"),
        }

        assert_eq!(
            client.last_response().unwrap().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn the_later_of_two_sequential_sends_wins_the_history() {
        let sender = MockSender::with_script([
            Ok(MockResponse::json(200, r#"{"n":1}"#)),
            Ok(MockResponse::json(200, r#"{"n":2}"#)),
        ]);
        let client = Client::new(sender);

        client.users().me().await.unwrap();
        client.users().me().await.unwrap();

        assert_eq!(
            client.last_response().unwrap().body().as_ref(),
            br#"{"n":2}"#
        );
    }

    #[tokio::test]
    async fn a_transport_failure_never_changes_the_history() {
        let sender = MockSender::with_script([
            Ok(MockResponse::json(200, r#"{"kept":true}"#)),
            Err(ScriptedFailure),
        ]);
        let client = Client::new(sender);

        client.users().me().await.unwrap();
        let err = client.users().me().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }), "{err}");

        assert_eq!(
            client.last_response().unwrap().body().as_ref(),
            br#"{"kept":true}"#
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_sends_record_whichever_completed_last() {
        let sender = MockSender::with_script([
            Ok(MockResponse::json(200, r#"{"task":"a"}"#)),
            Ok(MockResponse::json(200, r#"{"task":"b"}"#)),
        ]);
        let client = Arc::new(Client::new(sender));

        let a = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.users().me().await }
        });
        let b = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.users().me().await }
        });

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let last = client.last_response().unwrap();
        let body = last.body().as_ref();
        assert!(
            body == br#"{"task":"a"}"# || body == br#"{"task":"b"}"#,
            "history must hold one of the completed responses"
        );
    }
}
