//! Authenticated request layer.
//!
//! Every call to the backend goes through [`ApiClient`]: it attaches the
//! bearer token and a request id, turns a 401 into
//! [`ApiError::SessionExpired`] after clearing the stored session, and
//! extracts the backend's `message` field from error bodies. Nothing is
//! retried.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{multipart::Form, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use leavedesk_core::config::AppConfig;

use crate::error::ApiError;
use crate::session::{Session, SessionStore};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    sessions: Arc<dyn SessionStore>,
    fixed_token: Option<SecretString>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
}

/// Some endpoints wrap collections in `{ "data": [...] }`, others return the
/// bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Envelope { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Envelope { data } | Self::Bare(data) => data,
        }
    }
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sessions,
            fixed_token: None,
        })
    }

    pub fn from_config(
        config: &AppConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        let client = Self::new(
            config.api.base_url.clone(),
            config.api.timeout_secs.map(Duration::from_secs),
            sessions,
        )?;
        Ok(match &config.api.token {
            Some(token) => client.with_token(SecretString::from(token.expose_secret().to_owned())),
            None => client,
        })
    }

    /// Uses this token instead of the stored session.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.fixed_token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchanges credentials for a token and stores it as the current session.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Session, ApiError> {
        let body = LoginBody { username, password: password.expose_secret() };
        let request = self.http.post(self.url("/auth/login")).json(&body);
        let response = self.execute(request, false).await?;
        let payload: LoginResponse = decode(response).await?;

        if payload.access_token.trim().is_empty() {
            return Err(ApiError::Decode(
                "login response carried an empty accessToken".to_string(),
            ));
        }

        let session = Session::new(payload.access_token, Some(username.to_string()));
        self.sessions.save(&session).await?;
        info!(event_name = "auth.login.succeeded", username, "signed in");
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.sessions.clear().await?;
        info!(event_name = "auth.logout", "session cleared");
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self.authorized(Method::GET, path).await?.query(query);
        decode(self.execute(request, true).await?).await
    }

    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        self.get_json::<Listing<T>>(path, query).await.map(Listing::into_vec)
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.authorized(method, path).await?.json(body);
        decode(self.execute(request, true).await?).await
    }

    /// Like [`ApiClient::send_json`] for endpoints whose response body is not
    /// needed.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut request = self.authorized(method, path).await?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, true).await.map(drop)
    }

    pub async fn send_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let request = self.authorized(Method::POST, path).await?.multipart(form);
        decode(self.execute(request, true).await?).await
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let request = self.http.request(method, self.url(path));
        if let Some(token) = &self.fixed_token {
            return Ok(request.bearer_auth(token.expose_secret()));
        }

        match self.sessions.load().await? {
            Some(session) => Ok(request.bearer_auth(session.token.expose_secret())),
            None => {
                debug!(event_name = "http.request.no_session", path, "no stored session");
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        authenticated: bool,
    ) -> Result<Response, ApiError> {
        let correlation_id = Uuid::new_v4().to_string();
        let request = request.header(REQUEST_ID_HEADER, &correlation_id);

        let response = request.send().await.map_err(|error| {
            warn!(
                event_name = "http.request.transport_failed",
                correlation_id = %correlation_id,
                error = %error,
                "request did not reach the backend"
            );
            ApiError::from(error)
        })?;

        let status = response.status();
        debug!(
            event_name = "http.request.completed",
            correlation_id = %correlation_id,
            path = %response.url().path(),
            status = status.as_u16(),
            "backend responded"
        );

        if status == StatusCode::UNAUTHORIZED && authenticated {
            warn!(
                event_name = "http.request.session_expired",
                correlation_id = %correlation_id,
                "backend rejected the token; clearing session"
            );
            if let Err(error) = self.sessions.clear().await {
                warn!(
                    event_name = "http.request.session_clear_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "stored session could not be removed"
                );
            }
            return Err(ApiError::SessionExpired);
        }

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = backend_message(&body);
            warn!(
                event_name = "http.request.rejected",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                message = message.as_deref().unwrap_or("-"),
                "backend returned an error status"
            );
            return Err(ApiError::Http { status: status.as_u16(), message });
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|error| ApiError::Decode(error.to_string()))
}

/// Pulls the human-readable `message` out of an error body. Validation
/// failures may carry a list of messages.
pub(crate) fn backend_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let message = match value.get("message")? {
        Value::String(message) => message.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!message.is_empty()).then_some(message)
}
