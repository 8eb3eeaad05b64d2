//! Scriptable identity provider for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use feedup::identity::provider::{AuthResult, IdentityProvider, ProviderResult, SessionRef};
use feedup::identity::{ProviderError, UserProfile};

#[derive(Debug, Clone, Default)]
struct Account {
    user_id: String,
    password: String,
    profile: Option<UserProfile>,
}

/// In-memory provider with per-call failure switches and call counters.
///
/// Accounts are keyed by lower-cased email. A successful sign-in makes the
/// account the active session until `sign_out`.
#[derive(Default)]
pub struct MockIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    active: Mutex<Option<SessionRef>>,
    offline: Mutex<bool>,
    session_error: Mutex<Option<ProviderError>>,
    profile_error: Mutex<Option<ProviderError>>,
    sign_out_error: Mutex<Option<ProviderError>>,
    panic_on_sign_in: Mutex<bool>,
    panic_on_sign_out: Mutex<bool>,
    pub sign_in_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. `profile = None` models an auth account with no
    /// profile row.
    pub fn with_account(self, email: &str, password: &str, user_id: &str, profile: Option<UserProfile>) -> Self {
        let mut profile = profile;
        if let Some(p) = profile.as_mut() {
            p.id = user_id.to_string();
        }
        self.accounts.lock().insert(
            email.to_lowercase(),
            Account { user_id: user_id.to_string(), password: password.to_string(), profile },
        );
        self
    }

    /// Pretend a session for `user_id` is already active.
    pub fn with_active_session(self, user_id: &str) -> Self {
        *self.active.lock() = Some(SessionRef { user_id: user_id.to_string(), email: None });
        self
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    pub fn fail_session(&self, err: ProviderError) {
        *self.session_error.lock() = Some(err);
    }

    pub fn fail_profile_fetch(&self, err: ProviderError) {
        *self.profile_error.lock() = Some(err);
    }

    pub fn fail_sign_out(&self, err: ProviderError) {
        *self.sign_out_error.lock() = Some(err);
    }

    pub fn panic_on_sign_in(&self) {
        *self.panic_on_sign_in.lock() = true;
    }

    pub fn panic_on_sign_out(&self) {
        *self.panic_on_sign_out.lock() = true;
    }

    pub fn active_session(&self) -> Option<SessionRef> {
        self.active.lock().clone()
    }

    fn unreachable(&self) -> Option<ProviderError> {
        if *self.offline.lock() {
            Some(ProviderError::Unreachable("mock provider offline".into()))
        } else {
            None
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_session(&self) -> ProviderResult<Option<SessionRef>> {
        if let Some(e) = self.unreachable() {
            return Err(e);
        }
        if let Some(e) = self.session_error.lock().clone() {
            return Err(e);
        }
        Ok(self.active.lock().clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> ProviderResult<AuthResult> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if *self.panic_on_sign_in.lock() {
            panic!("mock provider sign-in blew up");
        }
        if let Some(e) = self.unreachable() {
            return Err(e);
        }
        let key = email.trim().to_lowercase();
        let user_id = match self.accounts.lock().get(&key) {
            Some(acct) if acct.password == password => acct.user_id.clone(),
            _ => return Err(ProviderError::InvalidCredentials),
        };
        *self.active.lock() = Some(SessionRef { user_id: user_id.clone(), email: Some(key.clone()) });
        Ok(AuthResult { user_id, email: Some(key) })
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if *self.panic_on_sign_out.lock() {
            panic!("mock provider sign-out blew up");
        }
        *self.active.lock() = None;
        if let Some(e) = self.unreachable() {
            return Err(e);
        }
        match self.sign_out_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn fetch_user(&self, id: &str) -> ProviderResult<Option<UserProfile>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.unreachable() {
            return Err(e);
        }
        if let Some(e) = self.profile_error.lock().clone() {
            return Err(e);
        }
        let accounts = self.accounts.lock();
        Ok(accounts
            .values()
            .filter_map(|a| a.profile.as_ref())
            .find(|p| p.id == id)
            .cloned())
    }
}
