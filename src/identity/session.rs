//! The authenticated-session surface the rest of the application consumes.
//!
//! An `AuthSession` is constructed by the composition root and shared by
//! reference. Its lifecycle is an explicit state machine:
//!
//! ```text
//!   Resolving ──restore──► Authenticated(user) ──logout──► Anonymous
//!       │                        ▲                            │
//!       └──────restore───► Anonymous ◄──────────login─────────┘
//! ```
//!
//! Restore, login and logout are serialized; only one resolution flow runs at
//! a time and restore always leaves `Resolving` before releasing the flow.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use super::guard::{self, RouteDecision, RouteRequirement, NEUTRAL_LANDING};
use super::resolver::{IdentityResolver, LoginRequest, Resolution};
use super::{has_permission, FeatureKey, IdentityProvider, PermissionLevel, Role, SeededDirectory, SessionStore, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Resolving,
    Authenticated(User),
    Anonymous,
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(u) => Some(u),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Resolving)
    }
}

pub struct AuthSession {
    resolver: IdentityResolver,
    state: RwLock<SessionState>,
    notify: watch::Sender<SessionState>,
    flow: Mutex<()>,
}

impl AuthSession {
    /// A session in the `Resolving` state. Call [`restore`](Self::restore)
    /// to settle it.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
        directory: Arc<SeededDirectory>,
    ) -> Self {
        Self::with_resolver(IdentityResolver::new(provider, store, directory))
    }

    pub fn with_resolver(resolver: IdentityResolver) -> Self {
        let (notify, _) = watch::channel(SessionState::Resolving);
        Self {
            resolver,
            state: RwLock::new(SessionState::Resolving),
            notify,
            flow: Mutex::new(()),
        }
    }

    /// Construct and restore in one go.
    pub async fn start(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
        directory: Arc<SeededDirectory>,
    ) -> Arc<Self> {
        let session = Arc::new(Self::new(provider, store, directory));
        session.restore().await;
        session
    }

    fn set_state(&self, next: SessionState) {
        *self.state.write() = next.clone();
        self.notify.send_replace(next);
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user().cloned()
    }

    pub fn loading(&self) -> bool {
        self.state.read().is_loading()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.notify.subscribe()
    }

    /// Re-establish the current user at startup: remote session first, then the
    /// cached entry. Always leaves the `Resolving` state.
    pub async fn restore(&self) -> SessionState {
        let _flow = self.flow.lock().await;
        self.set_state(SessionState::Resolving);
        let next = match self.resolver.restore().await {
            Resolution::Resolved { user, source } => {
                info!(target: "auth", user = %user.id, role = %user.role, ?source, "session restored");
                SessionState::Authenticated(user)
            }
            Resolution::Unresolved { reason } => {
                info!(target: "auth", "no session to restore: {reason}");
                SessionState::Anonymous
            }
        };
        self.set_state(next.clone());
        next
    }

    /// Log in with credentials. `expected_role` restricts role-specific entry
    /// points (e.g. the admin login) to accounts of that role. On failure the
    /// current user is left untouched.
    pub async fn login(&self, email: &str, password: &str, expected_role: Option<Role>) -> bool {
        let _flow = self.flow.lock().await;
        let req = LoginRequest::new(email, password, expected_role);
        match self.resolver.login(&req).await {
            Resolution::Resolved { user, source } => {
                info!(target: "auth", user = %user.id, role = %user.role, ?source, "login succeeded");
                self.set_state(SessionState::Authenticated(user));
                true
            }
            Resolution::Unresolved { reason } => {
                warn!(target: "auth", email = %req.email, "login failed: {reason}");
                false
            }
        }
    }

    /// Sign out remotely (best effort, failures and panics are logged), then
    /// drop the cached entry and the current user. Returns the neutral landing location to redirect to.
    pub async fn logout(&self) -> &'static str {
        let _flow = self.flow.lock().await;
        match AssertUnwindSafe(self.resolver.provider().sign_out()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(target: "auth", "remote sign-out failed: {e}"),
            Err(_) => warn!(target: "auth", "remote sign-out panicked"),
        }
        if let Err(e) = self.resolver.store().clear() {
            warn!(target: "auth", "failed to clear session cache: {e:#}");
        }
        self.set_state(SessionState::Anonymous);
        info!(target: "auth", "logged out");
        NEUTRAL_LANDING
    }

    pub fn has_permission(&self, feature: FeatureKey, required: PermissionLevel) -> bool {
        has_permission(self.state.read().user(), feature, required)
    }

    pub fn check_route(&self, path: &str, requirement: &RouteRequirement) -> RouteDecision {
        guard::evaluate(&self.state.read(), path, requirement)
    }

    /// Where the current user should land after login; `/` when anonymous.
    pub fn landing_path(&self) -> &'static str {
        guard::landing_path_for(self.state.read().user().map(|u| u.role))
    }
}
