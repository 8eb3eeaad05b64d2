use serde::{Deserialize, Serialize};

use super::matrix::permissions_for;
use super::permission::{FeatureKey, PermissionLevel, PermissionSet};
use super::Role;

/// Profile record as the identity provider stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
}

/// Resolved actor. `permissions` always comes from the role matrix; it is not
/// serialized, and deserializing a `User` re-derives it from `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserProfile", into = "UserProfile")]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub permissions: PermissionSet,
}

impl User {
    pub fn from_profile(profile: UserProfile) -> Self {
        let permissions = permissions_for(profile.role);
        Self {
            id: profile.id,
            display_name: profile.name,
            email: profile.email,
            role: profile.role,
            tenant_id: profile.tenant_id,
            tenant_name: profile.tenant_name,
            permissions,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.display_name.clone(),
            email: self.email.clone(),
            role: self.role,
            tenant_id: self.tenant_id.clone(),
            tenant_name: self.tenant_name.clone(),
        }
    }

    pub fn can(&self, feature: FeatureKey, required: PermissionLevel) -> bool {
        self.permissions.allows(feature, required)
    }
}

impl From<UserProfile> for User {
    fn from(profile: UserProfile) -> Self {
        User::from_profile(profile)
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            name: user.display_name,
            email: user.email,
            role: user.role,
            tenant_id: user.tenant_id,
            tenant_name: user.tenant_name,
        }
    }
}
