//! The authentication stage.

use std::str::FromStr;

use base64::prelude::*;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{HeaderValue, Request};

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::pipeline::{Next, Stage, StageKind};
use crate::platform::BoxFuture;
use crate::response::Response;

/// Supported authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// An OAuth bearer token: `Authorization: Bearer <token>`.
    OAuthToken,
    /// HTTP basic credentials: `Authorization: Basic base64(<token>:<password>)`.
    HttpPassword,
}

impl AuthMethod {
    /// The wire name of this method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::OAuthToken => "oauth_token",
            AuthMethod::HttpPassword => "http_password",
        }
    }
}

impl FromStr for AuthMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oauth_token" => Ok(AuthMethod::OAuthToken),
            "http_password" => Ok(AuthMethod::HttpPassword),
            other => Err(ApiError::Runtime {
                message: format!("Authentication method \"{other}\" not implemented."),
            }),
        }
    }
}

/// A stage attaching the Authorization header to every outgoing request.
///
/// The header value is computed once at construction; per-request handling
/// is a single unconditional header overwrite, so a request can never reach
/// the base sender unauthenticated while this stage is installed. The value
/// is marked sensitive and never appears in debug output.
#[derive(Debug, Clone)]
pub struct Authentication {
    header: HeaderValue,
}

impl Authentication {
    /// Creates the stage from a method and credentials.
    ///
    /// The password is only meaningful for [`AuthMethod::HttpPassword`] and
    /// defaults to the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidArgument`] if the credentials do not form
    /// a valid header value.
    pub fn new(method: AuthMethod, token: &str, password: Option<&str>) -> Result<Self, ApiError> {
        let raw = match method {
            AuthMethod::OAuthToken => format!("Bearer {token}"),
            AuthMethod::HttpPassword => {
                let credentials = format!("{token}:{}", password.unwrap_or_default());
                format!("Basic {}", BASE64_STANDARD.encode(credentials.as_bytes()))
            }
        };

        let mut header = HeaderValue::from_str(&raw).map_err(|_| ApiError::InvalidArgument {
            message: "Credentials do not form a valid Authorization header value.".to_owned(),
        })?;
        header.set_sensitive(true);

        Ok(Self { header })
    }

    #[cfg(test)]
    pub(crate) fn header_value(&self) -> &HeaderValue {
        &self.header
    }
}

impl<C: HttpClient> Stage<C> for Authentication {
    fn kind(&self) -> StageKind {
        StageKind::Auth
    }

    fn handle<'a>(
        &'a self,
        request: Request<Bytes>,
        next: Next<'a, C>,
    ) -> BoxFuture<'a, Result<Response, ApiError>> {
        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            parts.headers.insert(AUTHORIZATION, self.header.clone());

            next.run(Request::from_parts(parts, body)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::test_util::{MockResponse, MockSender};

    #[test]
    fn oauth_token_builds_a_bearer_header() {
        let auth = Authentication::new(AuthMethod::OAuthToken, "T", None).unwrap();
        assert_eq!(auth.header_value().to_str().unwrap(), "Bearer T");
    }

    #[test]
    fn http_password_builds_a_basic_header() {
        let auth = Authentication::new(AuthMethod::HttpPassword, "u", Some("p")).unwrap();
        assert_eq!(auth.header_value().to_str().unwrap(), "Basic dTpw");
    }

    #[test]
    fn a_missing_password_defaults_to_empty() {
        let auth = Authentication::new(AuthMethod::HttpPassword, "u", None).unwrap();
        // base64("u:")
        assert_eq!(auth.header_value().to_str().unwrap(), "Basic dTo=");
    }

    #[test]
    fn unknown_methods_fail_at_parse_time() {
        let err = "pigeon_post".parse::<AuthMethod>().unwrap_err();
        match err {
            ApiError::Runtime { message } => assert!(message.contains("not implemented")),
            other => panic!("expected Runtime, got {other:?}"),
        }
    }

    #[test]
    fn method_names_round_trip() {
        for method in [AuthMethod::OAuthToken, AuthMethod::HttpPassword] {
            assert_eq!(method.as_str().parse::<AuthMethod>().unwrap(), method);
        }
    }

    #[test]
    fn the_header_never_shows_in_debug_output() {
        let auth = Authentication::new(AuthMethod::OAuthToken, "secret", None).unwrap();
        assert!(!format!("{auth:?}").contains("secret"));
    }

    #[tokio::test]
    async fn the_stage_overwrites_any_existing_authorization_header() {
        let sender = MockSender::respond(MockResponse::empty(200));
        let mut pipeline = Pipeline::new(sender.clone());
        pipeline.add_stage(Box::new(
            Authentication::new(AuthMethod::OAuthToken, "fresh", None).unwrap(),
        ));

        let request = Request::builder()
            .uri("https://api.example.com/user")
            .header(AUTHORIZATION, "Bearer stale")
            .body(Bytes::new())
            .unwrap();
        pipeline.send(request).await.unwrap();

        let sent = sender.last_request();
        let values: Vec<_> = sent.headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Bearer fresh");
    }
}
