//!
//! FeedUp auth HTTP server
//! -----------------------
//! Axum surface over a single [`AuthSession`]. This is the composition root:
//! it picks the identity provider, the session store and the seeded directory
//! from configuration, starts session restore in the background and mounts
//! the routes below.
//!
//! The process hosts exactly one session: every client talking to the server
//! reads, logs into and logs out of the same `AuthSession`. It is meant to run
//! as a per-device daemon bound to loopback (the default `127.0.0.1` bind), not
//! as a multi-user service.
//!
//! Routes:
//! - `GET  /`                                 health text
//! - `GET  /session`                          loading flag, current user, landing path
//! - `POST /login`                            `{email, password, role?}`
//! - `POST /logout`
//! - `GET  /permissions/{feature}/{level}`    permission check for the current user
//! - `GET  /guard?path=...`                   route gating decision

use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{
    AuthSession, FeatureKey, FileSessionStore, HttpIdentityProvider, IdentityProvider, MemorySessionStore,
    OfflineIdentityProvider, PermissionLevel, PermissionSet, Role, RolePermissionMatrix, RouteTable,
    SeededDirectory, SessionStore, User, UserProfile,
};

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<AuthSession>,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session, routes: Arc::new(RouteTable::default_routes()) }
    }
}

#[derive(Debug, Serialize)]
struct UserView {
    #[serde(flatten)]
    profile: UserProfile,
    permissions: PermissionSet,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self { profile: u.profile(), permissions: u.permissions }
    }
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GuardQuery {
    path: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "feedup ok" }))
        .route("/session", get(session_handler))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/permissions/{feature}/{level}", get(permission_handler))
        .route("/guard", get(guard_handler))
        .with_state(state)
}

async fn session_handler(State(state): State<AppState>) -> impl IntoResponse {
    let s = &state.session;
    let user = s.user();
    Json(serde_json::json!({
        "status": "ok",
        "loading": s.loading(),
        "user": user.as_ref().map(UserView::from),
        "landing": s.landing_path(),
    }))
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> AppResult<impl IntoResponse> {
    let expected_role = match payload.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => Some(r.parse::<Role>()?),
        None => None,
    };
    if !state.session.login(&payload.email, &payload.password, expected_role).await {
        return Err(AppError::invalid_credentials());
    }
    let user = state.session.user().ok_or_else(AppError::invalid_credentials)?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "user": UserView::from(&user),
            "redirect": state.session.landing_path(),
        })),
    ))
}

async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let redirect = state.session.logout().await;
    Json(serde_json::json!({ "status": "ok", "redirect": redirect }))
}

async fn permission_handler(
    State(state): State<AppState>,
    Path((feature, level)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let feature: FeatureKey = feature.parse()?;
    let level: PermissionLevel = level.parse()?;
    let allowed = state.session.has_permission(feature, level);
    Ok(Json(serde_json::json!({
        "status": "ok",
        "feature": feature,
        "level": level,
        "allowed": allowed,
    })))
}

async fn guard_handler(State(state): State<AppState>, Query(q): Query<GuardQuery>) -> impl IntoResponse {
    let decision = state.routes.check(&state.session.state(), &q.path);
    let mut body = serde_json::to_value(&decision).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = body.as_object_mut() {
        obj.insert("path".into(), serde_json::Value::String(q.path));
    }
    Json(body)
}

fn build_provider(cfg: &AppConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match &cfg.identity_url {
        Some(url) => {
            let p = HttpIdentityProvider::new(url, cfg.identity_key.clone(), cfg.identity_timeout)
                .with_context(|| format!("build identity provider client for {url}"))?;
            Ok(Arc::new(p))
        }
        None => {
            warn!(target: "startup", "FEEDUP_IDENTITY_URL not set; running with offline identity provider");
            Ok(Arc::new(OfflineIdentityProvider))
        }
    }
}

fn build_store(cfg: &AppConfig) -> Arc<dyn SessionStore> {
    match &cfg.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path.clone())),
        None => Arc::new(MemorySessionStore::new()),
    }
}

/// Wire up the session from configuration. Restore is not started.
pub fn build_session(cfg: &AppConfig) -> anyhow::Result<Arc<AuthSession>> {
    RolePermissionMatrix::validate_builtin().context("built-in permission matrix")?;
    let provider = build_provider(cfg)?;
    let store = build_store(cfg);
    let directory = if cfg.seed_demo_accounts { SeededDirectory::demo() } else { SeededDirectory::empty() };
    info!(
        target: "startup",
        "auth wiring: provider={}, session_file={:?}, seeded_accounts={}",
        cfg.identity_url.as_deref().unwrap_or("<offline>"),
        cfg.session_file,
        directory.len()
    );
    Ok(Arc::new(AuthSession::new(provider, store, Arc::new(directory))))
}

pub async fn run_with_config(cfg: AppConfig) -> anyhow::Result<()> {
    let session = build_session(&cfg)?;

    // Restore in the background; /session reports loading until it settles.
    {
        let session = session.clone();
        tokio::spawn(async move {
            let state = session.restore().await;
            info!(target: "startup", authenticated = state.user().is_some(), "session restore finished");
        });
    }

    let app = build_router(AppState::new(session));
    let listener = tokio::net::TcpListener::bind(cfg.http_bind)
        .await
        .with_context(|| format!("bind {}", cfg.http_bind))?;
    info!(target: "startup", "feedup listening on http://{}", cfg.http_bind);
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}

/// Convenience entry point reading configuration from the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(AppConfig::from_env()?).await
}
