use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use trellis_core::{ApiError, BoardApi};
use trellis_model::{
    Board, ProjectId, Section, SectionId, SectionPatch, Task, TaskId, TaskMove, TaskPatch,
    TokenPair,
};

use crate::auth::{AuthError, AuthSession, CredentialStore, TokenRenewer};
use crate::backoff::Backoff;
use crate::error::ClientError;
use crate::routes::policy_for;

/// Success envelope every endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

/// Error body shape; `message` is optional because proxies occasionally
/// answer with bare status lines.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// JSON/HTTP transport for the board service.
///
/// Every request runs through [`AuthSession::authorized`], which attaches
/// the bearer credential and applies the refresh-and-retry policy on
/// expired-credential failures.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    session: Arc<AuthSession>,
    backoff: Backoff,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, session: Arc<AuthSession>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            backoff: Backoff::default(),
        }
    }

    /// Wire a transport against `base_url`, composing the renewal
    /// exchange and session from the given credential store.
    pub fn connect(base_url: &str, store: Arc<dyn CredentialStore>) -> Self {
        let renewer = Arc::new(HttpRenewer::new(base_url));
        let session = Arc::new(AuthSession::new(store, renewer));
        Self::new(base_url, session)
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn session(&self) -> Arc<AuthSession> {
        self.session.clone()
    }

    // ------------------------------------------------------------------
    // Authentication endpoints
    // ------------------------------------------------------------------

    /// Log in and install the issued credential pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ClientError> {
        let pair: TokenPair = self
            .request(Method::POST, "/auth/login", Some(&Credentials { email, password }))
            .await?;
        self.session.install(&pair);
        debug!("logged in");
        Ok(pair)
    }

    /// Register a new account and install the issued credential pair.
    pub async fn register(&self, email: &str, password: &str) -> Result<TokenPair, ClientError> {
        let pair: TokenPair = self
            .request(Method::POST, "/auth/register", Some(&Credentials { email, password }))
            .await?;
        self.session.install(&pair);
        Ok(pair)
    }

    /// Invalidate the credential pair server-side, then locally. The
    /// local session dies even if the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self
            .request_no_content(Method::POST, "/auth/logout", None::<&()>)
            .await;
        self.session.sign_out();
        result
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        self.session
            .authorized(policy_for(path), |token| {
                let mut req = self.http.request(method.clone(), format!("{}{path}", self.base_url));
                if let Some(token) = &token {
                    req = req.bearer_auth(token);
                }
                if let Some(body) = body {
                    req = req.json(body);
                }
                async move {
                    let response = req.send().await?;
                    let status = response.status().as_u16();
                    let body = response.text().await?;
                    decode_envelope(status, &body)
                }
            })
            .await
    }

    async fn request_no_content<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ClientError>
    where
        B: Serialize + Sync,
    {
        self.session
            .authorized(policy_for(path), |token| {
                let mut req = self.http.request(method.clone(), format!("{}{path}", self.base_url));
                if let Some(token) = &token {
                    req = req.bearer_auth(token);
                }
                if let Some(body) = body {
                    req = req.json(body);
                }
                async move {
                    let response = req.send().await?;
                    let status = response.status().as_u16();
                    let body = response.text().await?;
                    check_status(status, &body)
                }
            })
            .await
    }

    /// GET with backoff on transport-level failures. Only reads are
    /// retried this way; mutations go out exactly once.
    async fn get_with_retry<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut attempt = 0;
        loop {
            match self.request::<T, ()>(Method::GET, path, None).await {
                Err(ClientError::Http(err)) if attempt < self.backoff.retries => {
                    let delay = self.backoff.delay(attempt);
                    warn!(error = %err, attempt, "transient fetch failure, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Unwrap the `{ "data": ... }` success envelope or map a failure status
/// to a uniform error.
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    check_status(status, body)?;
    let envelope: ApiEnvelope<T> = serde_json::from_str(body)
        .map_err(|err| ClientError::Decode(format!("{err}, body: {body}")))?;
    Ok(envelope.data)
}

fn check_status(status: u16, body: &str) -> Result<(), ClientError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("request failed with status {status}"));
    Err(ClientError::Api { status, message })
}

/// Renewal exchange over the raw HTTP client.
///
/// This deliberately bypasses the authorized wrapper: the renewal route is
/// itself exempt, and the request authenticates with the renewal
/// credential rather than the access credential.
pub struct HttpRenewer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRenewer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TokenRenewer for HttpRenewer {
    async fn exchange(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        match decode_envelope::<TokenPair>(status, &body) {
            Ok(pair) => Ok(pair),
            Err(ClientError::Api { message, .. }) => Err(AuthError::Rejected(message)),
            Err(err) => Err(AuthError::Transport(err.to_string())),
        }
    }
}

#[async_trait]
impl BoardApi for HttpTransport {
    async fn fetch_board(&self, project: &ProjectId) -> Result<Board, ApiError> {
        self.get_with_retry(&format!("/projects/{project}/board"))
            .await
            .map_err(ApiError::from)
    }

    async fn create_task(&self, task: &Task) -> Result<Task, ApiError> {
        self.request(Method::POST, "/tasks", Some(task))
            .await
            .map_err(ApiError::from)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        self.request(Method::PATCH, &format!("/tasks/{id}"), Some(patch))
            .await
            .map_err(ApiError::from)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        self.request_no_content(Method::DELETE, &format!("/tasks/{id}"), None::<&()>)
            .await
            .map_err(ApiError::from)
    }

    async fn move_task(&self, id: &TaskId, dest: &TaskMove) -> Result<Task, ApiError> {
        self.request(Method::POST, &format!("/tasks/{id}/move"), Some(dest))
            .await
            .map_err(ApiError::from)
    }

    async fn duplicate_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        self.request::<Task, ()>(Method::POST, &format!("/tasks/{id}/duplicate"), None)
            .await
            .map_err(ApiError::from)
    }

    async fn create_section(&self, section: &Section) -> Result<Section, ApiError> {
        self.request(Method::POST, "/sections", Some(section))
            .await
            .map_err(ApiError::from)
    }

    async fn update_section(
        &self,
        id: &SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, ApiError> {
        self.request(Method::PATCH, &format!("/sections/{id}"), Some(patch))
            .await
            .map_err(ApiError::from)
    }

    async fn delete_section(&self, id: &SectionId) -> Result<(), ApiError> {
        self.request_no_content(Method::DELETE, &format!("/sections/{id}"), None::<&()>)
            .await
            .map_err(ApiError::from)
    }
}
