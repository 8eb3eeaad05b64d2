//! Static role → feature → level policy.
//!
//! The table below is the only place access policy lives. It is validated once
//! when first touched: every role must appear exactly once and every role must
//! list every feature exactly once. Changing policy means changing this table.

use once_cell::sync::Lazy;

use super::permission::{FeatureKey, PermissionLevel, PermissionSet};
use super::{MatrixError, Role};

use super::permission::FeatureKey as F;
use super::permission::PermissionLevel::{Limited as L, None as N, Read as R, Write as W};

pub type RoleRow = (Role, &'static [(FeatureKey, PermissionLevel)]);

const OWNER: &[(FeatureKey, PermissionLevel)] = &[
    (F::Dashboard, W),
    (F::Menu, W),
    (F::Tables, W),
    (F::Orders, W),
    (F::OrderStatus, W),
    (F::Kitchen, R),
    (F::Requests, W),
    (F::TipManagement, W),
    (F::TipReports, R),
    (F::Analytics, R),
    (F::Feedback, R),
    (F::Crm, W),
    (F::Pos, W),
    (F::TokenManagement, W),
    (F::Staff, W),
    (F::Subscription, W),
    (F::Branding, W),
    (F::ActivityLogs, R),
    (F::DemoAccounts, N),
    (F::FeatureFlags, N),
    (F::Addons, W),
    (F::DeleteData, W),
    (F::ClearTable, W),
];

const MANAGER: &[(FeatureKey, PermissionLevel)] = &[
    (F::Dashboard, R),
    (F::Menu, W),
    (F::Tables, W),
    (F::Orders, W),
    (F::OrderStatus, W),
    (F::Kitchen, R),
    (F::Requests, W),
    (F::TipManagement, W),
    (F::TipReports, R),
    (F::Analytics, R),
    (F::Feedback, R),
    (F::Crm, R),
    (F::Pos, W),
    (F::TokenManagement, W),
    (F::Staff, R),
    (F::Subscription, N),
    (F::Branding, N),
    (F::ActivityLogs, R),
    (F::DemoAccounts, N),
    (F::FeatureFlags, N),
    (F::Addons, R),
    (F::DeleteData, N),
    (F::ClearTable, W),
];

const KITCHEN: &[(FeatureKey, PermissionLevel)] = &[
    (F::Dashboard, L),
    (F::Menu, R),
    (F::Tables, N),
    (F::Orders, L),
    (F::OrderStatus, W),
    (F::Kitchen, W),
    (F::Requests, N),
    (F::TipManagement, N),
    (F::TipReports, N),
    (F::Analytics, N),
    (F::Feedback, N),
    (F::Crm, N),
    (F::Pos, N),
    (F::TokenManagement, R),
    (F::Staff, N),
    (F::Subscription, N),
    (F::Branding, N),
    (F::ActivityLogs, N),
    (F::DemoAccounts, N),
    (F::FeatureFlags, N),
    (F::Addons, N),
    (F::DeleteData, N),
    (F::ClearTable, N),
];

const SERVICE: &[(FeatureKey, PermissionLevel)] = &[
    (F::Dashboard, L),
    (F::Menu, R),
    (F::Tables, R),
    (F::Orders, W),
    (F::OrderStatus, W),
    (F::Kitchen, R),
    (F::Requests, W),
    (F::TipManagement, L),
    (F::TipReports, L),
    (F::Analytics, N),
    (F::Feedback, R),
    (F::Crm, N),
    (F::Pos, L),
    (F::TokenManagement, N),
    (F::Staff, N),
    (F::Subscription, N),
    (F::Branding, N),
    (F::ActivityLogs, N),
    (F::DemoAccounts, N),
    (F::FeatureFlags, N),
    (F::Addons, N),
    (F::DeleteData, N),
    (F::ClearTable, W),
];

const ADMIN: &[(FeatureKey, PermissionLevel)] = &[
    (F::Dashboard, W),
    (F::Menu, W),
    (F::Tables, W),
    (F::Orders, W),
    (F::OrderStatus, W),
    (F::Kitchen, W),
    (F::Requests, W),
    (F::TipManagement, W),
    (F::TipReports, W),
    (F::Analytics, W),
    (F::Feedback, W),
    (F::Crm, W),
    (F::Pos, W),
    (F::TokenManagement, W),
    (F::Staff, W),
    (F::Subscription, W),
    (F::Branding, W),
    (F::ActivityLogs, W),
    (F::DemoAccounts, W),
    (F::FeatureFlags, W),
    (F::Addons, W),
    (F::DeleteData, W),
    (F::ClearTable, W),
];

const GUEST: &[(FeatureKey, PermissionLevel)] = &[
    (F::Dashboard, N),
    (F::Menu, R),
    (F::Tables, N),
    (F::Orders, N),
    (F::OrderStatus, N),
    (F::Kitchen, N),
    (F::Requests, L),
    (F::TipManagement, N),
    (F::TipReports, N),
    (F::Analytics, N),
    (F::Feedback, L),
    (F::Crm, N),
    (F::Pos, N),
    (F::TokenManagement, N),
    (F::Staff, N),
    (F::Subscription, N),
    (F::Branding, N),
    (F::ActivityLogs, N),
    (F::DemoAccounts, N),
    (F::FeatureFlags, N),
    (F::Addons, N),
    (F::DeleteData, N),
    (F::ClearTable, N),
];

pub const BUILTIN_TABLE: &[RoleRow] = &[
    (Role::Owner, OWNER),
    (Role::Manager, MANAGER),
    (Role::Kitchen, KITCHEN),
    (Role::Service, SERVICE),
    (Role::Admin, ADMIN),
    (Role::Guest, GUEST),
];

static BUILTIN: Lazy<RolePermissionMatrix> = Lazy::new(|| {
    RolePermissionMatrix::from_table(BUILTIN_TABLE)
        .unwrap_or_else(|e| panic!("built-in permission matrix is invalid: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissionMatrix {
    sets: [PermissionSet; 6],
}

impl RolePermissionMatrix {
    /// Build and validate a matrix. Rejects tables that miss a role, repeat a
    /// role, or do not give every feature exactly one level for every role.
    pub fn from_table(table: &[RoleRow]) -> Result<Self, MatrixError> {
        let mut sets: [Option<PermissionSet>; 6] = [None; 6];
        for (role, entries) in table {
            if sets[role.index()].is_some() {
                return Err(MatrixError::DuplicateRole(*role));
            }
            let mut seen = [false; FeatureKey::COUNT];
            for (feature, _) in entries.iter() {
                if seen[feature.index()] {
                    return Err(MatrixError::DuplicateFeature { role: *role, feature: *feature });
                }
                seen[feature.index()] = true;
            }
            if let Some(missing) = FeatureKey::ALL.iter().find(|k| !seen[k.index()]) {
                return Err(MatrixError::MissingFeature { role: *role, feature: *missing });
            }
            sets[role.index()] = Some(PermissionSet::from_entries(entries));
        }
        let mut out = [PermissionSet::none(); 6];
        for role in Role::ALL {
            match sets[role.index()] {
                Some(set) => out[role.index()] = set,
                None => return Err(MatrixError::MissingRole(role)),
            }
        }
        Ok(Self { sets: out })
    }

    /// The process-wide built-in matrix.
    pub fn builtin() -> &'static RolePermissionMatrix {
        &BUILTIN
    }

    /// Validate the built-in table without panicking; used at startup so a bad
    /// table fails the boot with a readable error.
    pub fn validate_builtin() -> Result<(), MatrixError> {
        Self::from_table(BUILTIN_TABLE).map(|_| ())
    }

    pub fn for_role(&self, role: Role) -> &PermissionSet {
        &self.sets[role.index()]
    }

    pub fn level(&self, role: Role, feature: FeatureKey) -> PermissionLevel {
        self.for_role(role).get(feature)
    }
}

/// Permissions the built-in matrix grants `role`.
pub fn permissions_for(role: Role) -> PermissionSet {
    *RolePermissionMatrix::builtin().for_role(role)
}
