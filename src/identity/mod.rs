//! Central identity, permission and session management for FeedUp.
//! Keep the public surface thin and split implementation across sub-modules.

mod errors;
mod role;
mod user;
pub mod permission;
pub mod matrix;
pub mod store;
pub mod provider;
pub mod directory;
pub mod resolver;
pub mod session;
pub mod guard;

pub use errors::{MatrixError, ParseError, ProviderError};
pub use role::Role;
pub use user::{User, UserProfile};
pub use permission::{has_permission, FeatureKey, PermissionLevel, PermissionSet};
pub use matrix::{permissions_for, RolePermissionMatrix};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use provider::{AuthResult, HttpIdentityProvider, IdentityProvider, OfflineIdentityProvider, SessionRef};
pub use directory::SeededDirectory;
pub use resolver::{IdentityResolver, LoginRequest, Resolution, Source};
pub use session::{AuthSession, SessionState};
pub use guard::{landing_path_for, login_path_for, RouteDecision, RouteRequirement, RouteTable};
