//! Route gating: a pure decision over the session state and a route's
//! declared requirements.

use serde::Serialize;

use super::session::SessionState;
use super::{has_permission, FeatureKey, PermissionLevel, Role};

pub const NEUTRAL_LANDING: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// Canonical landing page per role. Every redirect by role goes through here.
pub fn landing_path_for(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Owner) => "/partner/dashboard",
        Some(Role::Manager) => "/manager/dashboard",
        Some(Role::Kitchen) => "/kitchen/orders",
        Some(Role::Service) => "/servant/orders",
        Some(Role::Admin) => "/admin/dashboard",
        Some(Role::Guest) | None => NEUTRAL_LANDING,
    }
}

/// Login entry point for an anonymous visitor of `path`.
pub fn login_path_for(path: &str) -> &'static str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if path == "/admin" || path.starts_with("/admin/") {
        ADMIN_LOGIN_PATH
    } else {
        LOGIN_PATH
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    pub required_roles: Option<Vec<Role>>,
    pub required_permission: Option<(FeatureKey, PermissionLevel)>,
}

impl RouteRequirement {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn roles(roles: &[Role]) -> Self {
        Self { required_roles: Some(roles.to_vec()), required_permission: None }
    }

    pub fn permission(feature: FeatureKey, level: PermissionLevel) -> Self {
        Self { required_roles: None, required_permission: Some((feature, level)) }
    }

    pub fn and_permission(mut self, feature: FeatureKey, level: PermissionLevel) -> Self {
        self.required_permission = Some((feature, level));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteDecision {
    Pending,
    Render,
    Redirect { location: String },
}

impl RouteDecision {
    fn redirect(location: &str) -> Self {
        RouteDecision::Redirect { location: location.to_string() }
    }
}

pub fn evaluate(state: &SessionState, path: &str, requirement: &RouteRequirement) -> RouteDecision {
    let user = match state {
        SessionState::Resolving => return RouteDecision::Pending,
        SessionState::Anonymous => return RouteDecision::redirect(login_path_for(path)),
        SessionState::Authenticated(u) => u,
    };
    if let Some(roles) = &requirement.required_roles {
        if !roles.contains(&user.role) {
            return RouteDecision::redirect(landing_path_for(Some(user.role)));
        }
    }
    if let Some((feature, level)) = requirement.required_permission {
        if !has_permission(Some(user), feature, level) {
            return RouteDecision::redirect(landing_path_for(Some(user.role)));
        }
    }
    RouteDecision::Render
}

/// Declared requirements for the application's protected sections.
/// Lookup is by longest matching path prefix on segment boundaries.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<(String, RouteRequirement)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, prefix: &str, requirement: RouteRequirement) -> Self {
        self.routes.push((prefix.trim_end_matches('/').to_string(), requirement));
        self
    }

    pub fn default_routes() -> Self {
        use crate::identity::FeatureKey as F;
        use crate::identity::PermissionLevel as L;
        Self::new()
            .route("/partner", RouteRequirement::roles(&[Role::Owner]))
            .route("/partner/staff", RouteRequirement::roles(&[Role::Owner]).and_permission(F::Staff, L::Write))
            .route("/partner/subscription", RouteRequirement::roles(&[Role::Owner]).and_permission(F::Subscription, L::Write))
            .route("/partner/branding", RouteRequirement::roles(&[Role::Owner]).and_permission(F::Branding, L::Write))
            .route("/partner/analytics", RouteRequirement::roles(&[Role::Owner]).and_permission(F::Analytics, L::Read))
            .route("/manager", RouteRequirement::roles(&[Role::Manager]))
            .route("/manager/staff", RouteRequirement::roles(&[Role::Manager]).and_permission(F::Staff, L::Read))
            .route("/manager/tips", RouteRequirement::roles(&[Role::Manager]).and_permission(F::TipManagement, L::Write))
            .route("/kitchen", RouteRequirement::roles(&[Role::Kitchen]))
            .route("/kitchen/orders", RouteRequirement::roles(&[Role::Kitchen]).and_permission(F::Kitchen, L::Write))
            .route("/servant", RouteRequirement::roles(&[Role::Service]))
            .route("/servant/tips", RouteRequirement::roles(&[Role::Service]).and_permission(F::TipManagement, L::Limited))
            .route("/admin", RouteRequirement::roles(&[Role::Admin]))
            .route("/admin/feature-flags", RouteRequirement::roles(&[Role::Admin]).and_permission(F::FeatureFlags, L::Write))
            .route("/admin/demo-accounts", RouteRequirement::roles(&[Role::Admin]).and_permission(F::DemoAccounts, L::Write))
            .route("/staff", RouteRequirement::permission(F::Staff, L::Write))
            .route("/pos", RouteRequirement::roles(&[Role::Owner, Role::Manager, Role::Service]).and_permission(F::Pos, L::Read))
    }

    /// Requirement for `path`, or `None` when the path is public. Login pages
    /// themselves are never gated.
    pub fn requirement_for(&self, path: &str) -> Option<&RouteRequirement> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        if path == LOGIN_PATH || path == ADMIN_LOGIN_PATH {
            return None;
        }
        self.routes
            .iter()
            .filter(|(prefix, _)| {
                path == prefix
                    || (path.starts_with(prefix.as_str()) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, req)| req)
    }

    /// Gate `path` against the table; public paths always render.
    pub fn check(&self, state: &SessionState, path: &str) -> RouteDecision {
        match self.requirement_for(path) {
            Some(req) => evaluate(state, path, req),
            None => RouteDecision::Render,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{User, UserProfile};

    fn authed(role: Role) -> SessionState {
        SessionState::Authenticated(User::from_profile(UserProfile {
            id: format!("{role}-1"),
            name: role.to_string(),
            email: format!("{role}@example.com"),
            role,
            tenant_id: None,
            tenant_name: None,
        }))
    }

    #[test]
    fn landing_paths() {
        assert_eq!(landing_path_for(Some(Role::Owner)), "/partner/dashboard");
        assert_eq!(landing_path_for(Some(Role::Manager)), "/manager/dashboard");
        assert_eq!(landing_path_for(Some(Role::Kitchen)), "/kitchen/orders");
        assert_eq!(landing_path_for(Some(Role::Service)), "/servant/orders");
        assert_eq!(landing_path_for(Some(Role::Admin)), "/admin/dashboard");
        assert_eq!(landing_path_for(Some(Role::Guest)), "/");
        assert_eq!(landing_path_for(None), "/");
    }

    #[test]
    fn login_paths() {
        assert_eq!(login_path_for("/admin/dashboard"), "/admin/login");
        assert_eq!(login_path_for("/admin"), "/admin/login");
        assert_eq!(login_path_for("/admin?tab=flags"), "/admin/login");
        assert_eq!(login_path_for("/admin#top"), "/admin/login");
        assert_eq!(login_path_for("/administrator"), "/login");
        assert_eq!(login_path_for("/partner/dashboard"), "/login");
    }

    #[test]
    fn resolving_is_pending() {
        let req = RouteRequirement::roles(&[Role::Owner]);
        assert_eq!(evaluate(&SessionState::Resolving, "/partner", &req), RouteDecision::Pending);
    }

    #[test]
    fn anonymous_goes_to_login() {
        let req = RouteRequirement::open();
        assert_eq!(
            evaluate(&SessionState::Anonymous, "/admin/dashboard", &req),
            RouteDecision::Redirect { location: "/admin/login".into() }
        );
        assert_eq!(
            evaluate(&SessionState::Anonymous, "/kitchen/orders", &req),
            RouteDecision::Redirect { location: "/login".into() }
        );
    }

    #[test]
    fn wrong_role_goes_to_own_landing() {
        let req = RouteRequirement::roles(&[Role::Admin]);
        assert_eq!(
            evaluate(&authed(Role::Kitchen), "/admin/dashboard", &req),
            RouteDecision::Redirect { location: "/kitchen/orders".into() }
        );
        assert_eq!(evaluate(&authed(Role::Admin), "/admin/dashboard", &req), RouteDecision::Render);
    }

    #[test]
    fn denied_permission_goes_to_own_landing() {
        let req = RouteRequirement::permission(FeatureKey::Staff, PermissionLevel::Write);
        assert_eq!(
            evaluate(&authed(Role::Manager), "/staff", &req),
            RouteDecision::Redirect { location: "/manager/dashboard".into() }
        );
        assert_eq!(evaluate(&authed(Role::Owner), "/staff", &req), RouteDecision::Render);
    }

    #[test]
    fn table_uses_longest_prefix() {
        let t = RouteTable::default_routes();
        assert_eq!(
            t.requirement_for("/partner/staff/new"),
            Some(&RouteRequirement::roles(&[Role::Owner]).and_permission(FeatureKey::Staff, PermissionLevel::Write))
        );
        assert_eq!(t.requirement_for("/partner/dashboard"), Some(&RouteRequirement::roles(&[Role::Owner])));
        assert_eq!(t.requirement_for("/partnership"), None);
        assert_eq!(t.requirement_for("/admin/login"), None);
        assert_eq!(t.requirement_for("/admin/login?next=/admin/addons"), None);
        assert_eq!(t.requirement_for("/menu?table=4"), None);
    }

    #[test]
    fn table_check_sends_admin_with_query_to_admin_login() {
        let t = RouteTable::default_routes();
        assert_eq!(
            t.check(&SessionState::Anonymous, "/admin?tab=flags"),
            RouteDecision::Redirect { location: "/admin/login".into() }
        );
        assert_eq!(
            t.check(&SessionState::Anonymous, "/partner/staff?page=2"),
            RouteDecision::Redirect { location: "/login".into() }
        );
    }

    #[test]
    fn table_check_public_paths_render_for_anyone() {
        let t = RouteTable::default_routes();
        assert_eq!(t.check(&SessionState::Anonymous, "/"), RouteDecision::Render);
        assert_eq!(t.check(&SessionState::Resolving, "/login"), RouteDecision::Render);
    }

    #[test]
    fn service_tips_need_limited_which_write_does_not_give() {
        let t = RouteTable::default_routes();
        assert_eq!(t.check(&authed(Role::Service), "/servant/tips"), RouteDecision::Render);
        let req = RouteRequirement::permission(FeatureKey::TipManagement, PermissionLevel::Limited);
        assert_eq!(
            evaluate(&authed(Role::Owner), "/tips", &req),
            RouteDecision::Redirect { location: "/partner/dashboard".into() }
        );
    }

    #[test]
    fn decision_serializes_with_tag() {
        let v = serde_json::to_value(RouteDecision::Redirect { location: "/login".into() }).unwrap();
        assert_eq!(v, serde_json::json!({"decision": "redirect", "location": "/login"}));
        let v = serde_json::to_value(RouteDecision::Pending).unwrap();
        assert_eq!(v, serde_json::json!({"decision": "pending"}));
    }
}
