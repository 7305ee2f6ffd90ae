//! Client for the externally hosted cloud functions.
//!
//! Every call is a single POST with no retry. Callers decide how a failure
//! maps to their response; this module only reports what happened.

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument};
use utoipa::ToSchema;

const SESSION_ID_HEADER: &str = "x-session-id";
const SESSION_KEY_HEADER: &str = "x-session-key";

/// The opaque token pair identifying a session to the auth service.
#[derive(Clone, Debug)]
pub struct SessionTokens {
    pub id: String,
    pub key: SecretString,
}

impl SessionTokens {
    #[must_use]
    pub fn new(id: String, key: SecretString) -> Self {
        Self { id, key }
    }
}

/// Identity returned by the session verifier.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HostIdentity {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session minted by the session-creation function at login.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedSession {
    session_id: String,
    session_key: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevokeScope {
    ThisDevice,
    AllDevices,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned {status}")]
    Status { status: StatusCode, body: String },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream response could not be parsed: {0}")]
    Decode(String),
}

/// Cloud function URLs. Defaults point at the hosted functions and are
/// overridden from configuration.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub verify_session: String,
    pub create_session: String,
    pub logout: String,
    pub logout_all: String,
    pub register_host: String,
}

pub const DEFAULT_FUNCTIONS_BASE: &str = "https://us-central1-hostdash-prod.cloudfunctions.net";

impl Default for Endpoints {
    fn default() -> Self {
        Self::from_base(DEFAULT_FUNCTIONS_BASE)
    }
}

impl Endpoints {
    /// Derive every endpoint from one base URL.
    #[must_use]
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            verify_session: format!("{base}/verifyHostSession"),
            create_session: format!("{base}/createHostSession"),
            logout: format!("{base}/logoutHost"),
            logout_all: format!("{base}/logoutHostAllDevices"),
            register_host: format!("{base}/registerHost"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CloudFunctions {
    client: Client,
    endpoints: Endpoints,
}

impl CloudFunctions {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoints: Endpoints) -> Result<Self, UpstreamError> {
        let client = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;
        Ok(Self { client, endpoints })
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Ask the auth service whether the token pair is a live session.
    ///
    /// Tokens travel in the JSON body. Any non-2xx status or a body that is
    /// not `{uid, email?}` is an error.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or an unparsable body.
    #[instrument(skip(self, tokens))]
    pub async fn verify_session(&self, tokens: &SessionTokens) -> Result<HostIdentity, UpstreamError> {
        let body = json!({
            "sessionId": tokens.id,
            "sessionKey": tokens.key.expose_secret(),
        });
        let response = self
            .client
            .post(&self.endpoints.verify_session)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Decode(err.to_string()))
    }

    /// Exchange an identity token for a new session pair.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or an unparsable body.
    #[instrument(skip(self, id_token))]
    pub async fn create_session(&self, id_token: &str) -> Result<SessionTokens, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoints.create_session)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        let issued: IssuedSession =
            serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Decode(err.to_string()))?;
        if issued.session_id.is_empty() || issued.session_key.is_empty() {
            return Err(UpstreamError::Decode("empty session tokens".to_string()));
        }
        Ok(SessionTokens::new(
            issued.session_id,
            SecretString::from(issued.session_key),
        ))
    }

    /// Revoke the session on this device or on every device.
    ///
    /// Tokens travel in request headers.
    ///
    /// # Errors
    /// Returns an error on transport failure or non-success status.
    #[instrument(skip(self, tokens))]
    pub async fn revoke_session(
        &self,
        tokens: &SessionTokens,
        scope: RevokeScope,
    ) -> Result<(), UpstreamError> {
        let url = match scope {
            RevokeScope::ThisDevice => &self.endpoints.logout,
            RevokeScope::AllDevices => &self.endpoints.logout_all,
        };
        let response = self
            .client
            .post(url)
            .header(SESSION_ID_HEADER, &tokens.id)
            .header(SESSION_KEY_HEADER, tokens.key.expose_secret())
            .json(&json!({}))
            .send()
            .await?;
        check_status(response).await?;
        debug!("session revoked upstream");
        Ok(())
    }

    /// Forward a host registration and return the upstream JSON body.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status, or an unparsable body.
    #[instrument(skip(self, payload))]
    pub async fn register_host<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoints.register_host)
            .json(payload)
            .send()
            .await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Decode(err.to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tokens() -> SessionTokens {
        SessionTokens::new("sid-1".to_string(), SecretString::from("skey-1".to_string()))
    }

    #[test]
    fn endpoints_from_base_trims_slash() {
        let endpoints = Endpoints::from_base("http://localhost:5001/");
        assert_eq!(endpoints.verify_session, "http://localhost:5001/verifyHostSession");
        assert_eq!(endpoints.logout_all, "http://localhost:5001/logoutHostAllDevices");
    }

    #[test]
    fn session_tokens_debug_hides_key() {
        let rendered = format!("{:?}", tokens());
        assert!(rendered.contains("sid-1"));
        assert!(!rendered.contains("skey-1"));
    }

    #[tokio::test]
    async fn verify_session_sends_tokens_in_body() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verifyHostSession"))
            .and(body_json(json!({ "sessionId": "sid-1", "sessionKey": "skey-1" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "uid": "host-1", "email": "h@example.com" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let functions = CloudFunctions::new(Endpoints::from_base(&server.uri()))?;
        let identity = functions.verify_session(&tokens()).await?;
        assert_eq!(identity.uid, "host-1");
        assert_eq!(identity.email.as_deref(), Some("h@example.com"));
        Ok(())
    }

    #[tokio::test]
    async fn verify_session_rejects_unparsable_body() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let functions = CloudFunctions::new(Endpoints::from_base(&server.uri()))?;
        let result = functions.verify_session(&tokens()).await;
        assert!(matches!(result, Err(UpstreamError::Decode(_))));
        Ok(())
    }

    #[tokio::test]
    async fn revoke_sends_tokens_in_headers() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logoutHostAllDevices"))
            .and(header("x-session-id", "sid-1"))
            .and(header("x-session-key", "skey-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let functions = CloudFunctions::new(Endpoints::from_base(&server.uri()))?;
        functions
            .revoke_session(&tokens(), RevokeScope::AllDevices)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_keeps_body() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/registerHost"))
            .respond_with(ResponseTemplate::new(409).set_body_string("already registered"))
            .mount(&server)
            .await;

        let functions = CloudFunctions::new(Endpoints::from_base(&server.uri()))?;
        let result = functions.register_host(&json!({ "idToken": "t" })).await;
        match result {
            Err(UpstreamError::Status { status, body }) => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(body, "already registered");
            }
            other => anyhow::bail!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn create_session_rejects_empty_tokens() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/createHostSession"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "sessionId": "", "sessionKey": "" })),
            )
            .mount(&server)
            .await;

        let functions = CloudFunctions::new(Endpoints::from_base(&server.uri()))?;
        let result = functions.create_session("id-token").await;
        assert!(matches!(result, Err(UpstreamError::Decode(_))));
        Ok(())
    }
}
