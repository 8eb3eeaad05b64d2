use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderError, UserProfile};

/// Active session as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub user_id: String,
    pub email: Option<String>,
}

/// Result of a successful password sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub user_id: String,
    pub email: Option<String>,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Remote identity provider. Implementations report failures as values; the
/// resolver decides which of them are recoverable.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_session(&self) -> ProviderResult<Option<SessionRef>>;
    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<AuthResult>;
    async fn sign_out(&self) -> ProviderResult<()>;
    async fn fetch_user(&self, id: &str) -> ProviderResult<Option<UserProfile>>;
}

/// Provider used when no remote endpoint is configured. Every call fails as
/// unreachable, so the cache and the seeded directory serve all requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineIdentityProvider;

#[async_trait]
impl IdentityProvider for OfflineIdentityProvider {
    async fn get_session(&self) -> ProviderResult<Option<SessionRef>> {
        Err(ProviderError::Unreachable("no identity provider configured".into()))
    }
    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> ProviderResult<AuthResult> {
        Err(ProviderError::Unreachable("no identity provider configured".into()))
    }
    async fn sign_out(&self) -> ProviderResult<()> {
        Err(ProviderError::Unreachable("no identity provider configured".into()))
    }
    async fn fetch_user(&self, _id: &str) -> ProviderResult<Option<UserProfile>> {
        Err(ProviderError::Unreachable("no identity provider configured".into()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: RemoteUser,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Client for a GoTrue/PostgREST style backend: password grant and session
/// lookup under `/auth/v1`, profile rows under `/rest/v1/users`.
pub struct HttpIdentityProvider {
    base: String,
    api_key: Option<String>,
    client: reqwest::Client,
    access_token: RwLock<Option<String>>,
}

impl HttpIdentityProvider {
    pub fn new(base: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            api_key,
            client,
            access_token: RwLock::new(None),
        })
    }

    /// Resume with a token obtained elsewhere (for example a previous process).
    pub fn with_access_token(self, token: impl Into<String>) -> Self {
        *self.access_token.write() = Some(token.into());
        self
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().clone()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut rb = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(key) = &self.api_key {
            rb = rb.header("apikey", key);
        }
        if let Some(token) = self.access_token.read().as_deref() {
            rb = rb.bearer_auth(token);
        }
        rb
    }
}

fn transport(e: reqwest::Error) -> ProviderError {
    ProviderError::Unreachable(e.to_string())
}

fn decode(e: reqwest::Error) -> ProviderError {
    ProviderError::Decode(e.to_string())
}

async fn rejected(resp: reqwest::Response) -> ProviderError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    ProviderError::Rejected { status, message }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_session(&self) -> ProviderResult<Option<SessionRef>> {
        if self.access_token.read().is_none() {
            return Ok(None);
        }
        let resp = self
            .request(reqwest::Method::GET, "/auth/v1/user")
            .send()
            .await
            .map_err(transport)?;
        match resp.status() {
            s if s.is_success() => {
                let u: RemoteUser = resp.json().await.map_err(decode)?;
                Ok(Some(SessionRef { user_id: u.id, email: u.email }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(target: "auth", "identity provider reports no active session");
                *self.access_token.write() = None;
                Ok(None)
            }
            _ => Err(rejected(resp).await),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<AuthResult> {
        let resp = self
            .request(reqwest::Method::POST, "/auth/v1/token?grant_type=password")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        match resp.status() {
            s if s.is_success() => {
                let tr: TokenResponse = resp.json().await.map_err(decode)?;
                *self.access_token.write() = Some(tr.access_token);
                Ok(AuthResult { user_id: tr.user.id, email: tr.user.email })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(ProviderError::InvalidCredentials),
            _ => Err(rejected(resp).await),
        }
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        if self.access_token.read().is_none() {
            return Ok(());
        }
        let sent = self.request(reqwest::Method::POST, "/auth/v1/logout").send().await;
        // The local token is dropped whatever the remote answer.
        *self.access_token.write() = None;
        let resp = sent.map_err(transport)?;
        if resp.status().is_success() || resp.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(rejected(resp).await)
        }
    }

    async fn fetch_user(&self, id: &str) -> ProviderResult<Option<UserProfile>> {
        let path = format!("/rest/v1/users?id=eq.{}&select=*", urlencoding::encode(id));
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }
        let rows: Vec<UserProfile> = resp.json().await.map_err(decode)?;
        Ok(rows.into_iter().next())
    }
}
