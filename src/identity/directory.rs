use std::collections::HashMap;

use super::{Role, User, UserProfile};

/// Fixed demo/test accounts, consulted only when the identity provider cannot
/// authenticate a login. Keys are trimmed, lower-cased emails.
#[derive(Debug, Clone, Default)]
pub struct SeededDirectory {
    accounts: HashMap<String, User>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl SeededDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// One demo account per staff role, all attached to the demo tenant except
    /// the platform admin.
    pub fn demo() -> Self {
        let tenant = || (Some("feedup-demo".to_string()), Some("FeedUp Demo Bistro".to_string()));
        let seeds = [
            ("demo-owner", "Demo Partner", "partner@feedup.com", Role::Owner, true),
            ("demo-manager", "Demo Manager", "manager@feedup.com", Role::Manager, true),
            ("demo-kitchen", "Demo Kitchen", "kitchen@feedup.com", Role::Kitchen, true),
            ("demo-service", "Demo Servant", "servant@feedup.com", Role::Service, true),
            ("demo-admin", "Platform Admin", "admin@feedup.com", Role::Admin, false),
        ];
        let mut dir = Self::empty();
        for (id, name, email, role, tenanted) in seeds {
            let (tenant_id, tenant_name) = if tenanted { tenant() } else { (None, None) };
            dir.insert(User::from_profile(UserProfile {
                id: id.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                role,
                tenant_id,
                tenant_name,
            }));
        }
        dir
    }

    pub fn insert(&mut self, user: User) {
        self.accounts.insert(normalize_email(&user.email), user);
    }

    pub fn get(&self, email: &str) -> Option<&User> {
        self.accounts.get(&normalize_email(email))
    }

    /// Seeded account for `email`, provided `expected_role` is absent or equal
    /// to the account's role.
    pub fn lookup(&self, email: &str, expected_role: Option<Role>) -> Option<User> {
        let user = self.get(email)?;
        match expected_role {
            Some(role) if role != user.role => None,
            _ => Some(user.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
