//! Identity resolution as ordered fallback chains.
//!
//! Each way of finding the current user is a [`Strategy`]. A chain is walked by
//! [`resolve_first`]: the first strategy that resolves wins, a strategy that
//! cannot help passes to the next one, and a strategy that detects an
//! integrity problem stops the chain outright. A strategy that panics is
//! treated like one that could not help.
//!
//! Restore runs `[remote, cache]`; login runs `[remote+profile, seeded]`.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use super::{IdentityProvider, Role, SeededDirectory, SessionStore, User};

/// What a single strategy concluded.
#[derive(Debug)]
pub enum Step {
    Resolved(User),
    /// This layer cannot help; try the next one.
    Next(String),
    /// Stop the chain and fail the whole resolution.
    Abort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Cache,
    Seeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { user: User, source: Source },
    Unresolved { reason: String },
}

impl Resolution {
    pub fn user(&self) -> Option<&User> {
        match self {
            Resolution::Resolved { user, .. } => Some(user),
            Resolution::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

#[async_trait]
pub trait Strategy<R: ?Sized + Sync>: Send + Sync {
    fn name(&self) -> &'static str;
    fn source(&self) -> Source;
    async fn attempt(&self, req: &R) -> Step;
}

/// Walk `chain` in order; the first `Resolved` wins.
pub async fn resolve_first<R: ?Sized + Sync>(chain: &[&dyn Strategy<R>], req: &R) -> Resolution {
    let mut last = String::from("no strategies configured");
    for strategy in chain {
        match AssertUnwindSafe(strategy.attempt(req)).catch_unwind().await {
            Ok(Step::Resolved(user)) => {
                debug!(target: "auth", strategy = strategy.name(), user = %user.id, "resolved");
                return Resolution::Resolved { user, source: strategy.source() };
            }
            Ok(Step::Next(reason)) => {
                debug!(target: "auth", strategy = strategy.name(), "falling through: {reason}");
                last = reason;
            }
            Ok(Step::Abort(reason)) => {
                warn!(target: "auth", strategy = strategy.name(), "aborting resolution: {reason}");
                return Resolution::Unresolved { reason };
            }
            Err(_) => {
                warn!(target: "auth", strategy = strategy.name(), "strategy panicked; falling through");
                last = format!("{} failed unexpectedly", strategy.name());
            }
        }
    }
    Resolution::Unresolved { reason: last }
}

#[derive(Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub expected_role: Option<Role>,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>, expected_role: Option<Role>) -> Self {
        Self { email: email.into(), password: password.into(), expected_role }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("expected_role", &self.expected_role)
            .finish()
    }
}

/// Remote session plus the profile record it points at.
pub struct RemoteRestore<'a> {
    pub provider: &'a dyn IdentityProvider,
}

#[async_trait]
impl<'a> Strategy<()> for RemoteRestore<'a> {
    fn name(&self) -> &'static str {
        "remote_restore"
    }
    fn source(&self) -> Source {
        Source::Remote
    }
    async fn attempt(&self, _req: &()) -> Step {
        let session = match self.provider.get_session().await {
            Ok(Some(s)) => s,
            Ok(None) => return Step::Next("no active remote session".into()),
            Err(e) => return Step::Next(e.to_string()),
        };
        match self.provider.fetch_user(&session.user_id).await {
            Ok(Some(profile)) => Step::Resolved(User::from_profile(profile)),
            Ok(None) => Step::Next(format!("no profile record for {}", session.user_id)),
            Err(e) => Step::Next(e.to_string()),
        }
    }
}

/// Last user written to the session store.
pub struct CachedRestore<'a> {
    pub store: &'a dyn SessionStore,
}

#[async_trait]
impl<'a> Strategy<()> for CachedRestore<'a> {
    fn name(&self) -> &'static str {
        "cached_restore"
    }
    fn source(&self) -> Source {
        Source::Cache
    }
    async fn attempt(&self, _req: &()) -> Step {
        match self.store.load() {
            Some(user) => Step::Resolved(user),
            None => Step::Next("no cached session".into()),
        }
    }
}

/// Password sign-in followed by the profile fetch. Once the provider has
/// accepted the credentials, a missing profile or a role mismatch ends the
/// login; the seeded directory is not consulted.
pub struct RemoteLogin<'a> {
    pub provider: &'a dyn IdentityProvider,
}

#[async_trait]
impl<'a> Strategy<LoginRequest> for RemoteLogin<'a> {
    fn name(&self) -> &'static str {
        "remote_login"
    }
    fn source(&self) -> Source {
        Source::Remote
    }
    async fn attempt(&self, req: &LoginRequest) -> Step {
        let auth = match self.provider.sign_in_with_password(&req.email, &req.password).await {
            Ok(a) => a,
            Err(e) => return Step::Next(e.to_string()),
        };
        let profile = match self.provider.fetch_user(&auth.user_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                return self.abort(format!("authenticated {} has no profile record", auth.user_id)).await;
            }
            Err(e) => return self.abort(format!("profile fetch for {} failed: {e}", auth.user_id)).await,
        };
        if let Some(expected) = req.expected_role {
            if profile.role != expected {
                return self.abort(format!("role {} does not match expected {}", profile.role, expected)).await;
            }
        }
        Step::Resolved(User::from_profile(profile))
    }
}

impl<'a> RemoteLogin<'a> {
    /// The provider already switched its session to the rejected account;
    /// sign it out again before failing the login.
    async fn abort(&self, reason: String) -> Step {
        match AssertUnwindSafe(self.provider.sign_out()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(target: "auth", "sign-out after rejected login failed: {e}"),
            Err(_) => warn!(target: "auth", "sign-out after rejected login panicked"),
        }
        Step::Abort(reason)
    }
}

pub struct SeededLogin<'a> {
    pub directory: &'a SeededDirectory,
}

#[async_trait]
impl<'a> Strategy<LoginRequest> for SeededLogin<'a> {
    fn name(&self) -> &'static str {
        "seeded_login"
    }
    fn source(&self) -> Source {
        Source::Seeded
    }
    async fn attempt(&self, req: &LoginRequest) -> Step {
        match self.directory.lookup(&req.email, req.expected_role) {
            Some(user) => Step::Resolved(user),
            None => Step::Next("no matching seeded account".into()),
        }
    }
}

/// Runs the restore and login chains and writes resolved users through to the
/// session store.
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn SessionStore>,
    directory: Arc<SeededDirectory>,
}

impl IdentityResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
        directory: Arc<SeededDirectory>,
    ) -> Self {
        Self { provider, store, directory }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub async fn restore(&self) -> Resolution {
        let remote = RemoteRestore { provider: self.provider.as_ref() };
        let cached = CachedRestore { store: self.store.as_ref() };
        let chain: [&dyn Strategy<()>; 2] = [&remote, &cached];
        let res = resolve_first(&chain, &()).await;
        self.write_through(&res);
        res
    }

    pub async fn login(&self, req: &LoginRequest) -> Resolution {
        let remote = RemoteLogin { provider: self.provider.as_ref() };
        let seeded = SeededLogin { directory: self.directory.as_ref() };
        let chain: [&dyn Strategy<LoginRequest>; 2] = [&remote, &seeded];
        let res = resolve_first(&chain, req).await;
        self.write_through(&res);
        res
    }

    fn write_through(&self, res: &Resolution) {
        let Resolution::Resolved { user, source } = res else { return };
        if *source == Source::Cache {
            return;
        }
        match self.store.save(user) {
            Ok(()) => info!(target: "auth", user = %user.id, role = %user.role, ?source, "session cached"),
            Err(e) => warn!(target: "auth", user = %user.id, "failed to cache session: {e:#}"),
        }
    }
}
