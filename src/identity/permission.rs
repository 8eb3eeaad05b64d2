//! Feature keys, permission levels and the comparison rule between a granted
//! level and a required one.
//!
//! Levels are only partially ordered. `none` is the bottom and `write` the top,
//! but `limited` and `read` are siblings, and `write` does not satisfy a
//! `limited` requirement. See [`PermissionLevel::satisfies`].

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::{ParseError, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    None,
    Read,
    Limited,
    Write,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::None,
        PermissionLevel::Read,
        PermissionLevel::Limited,
        PermissionLevel::Write,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Limited => "limited",
            PermissionLevel::Write => "write",
        }
    }

    /// Whether holding `self` on a feature satisfies a check for `required`.
    ///
    /// - equal levels always satisfy each other
    /// - `write` satisfies `read`
    /// - `limited` satisfies `read`
    ///
    /// Nothing else does. In particular `write` does not satisfy `limited`.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        use PermissionLevel::*;
        match (self, required) {
            (g, r) if g == r => true,
            (Write, Read) => true,
            (Limited, Read) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        PermissionLevel::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == lowered)
            .ok_or_else(|| ParseError::UnknownLevel(s.to_string()))
    }
}

/// Named capability domain, gated independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKey {
    Dashboard,
    Menu,
    Tables,
    Orders,
    OrderStatus,
    Kitchen,
    Requests,
    TipManagement,
    TipReports,
    Analytics,
    Feedback,
    Crm,
    Pos,
    TokenManagement,
    Staff,
    Subscription,
    Branding,
    ActivityLogs,
    DemoAccounts,
    FeatureFlags,
    Addons,
    DeleteData,
    ClearTable,
}

impl FeatureKey {
    pub const COUNT: usize = 23;

    pub const ALL: [FeatureKey; FeatureKey::COUNT] = [
        FeatureKey::Dashboard,
        FeatureKey::Menu,
        FeatureKey::Tables,
        FeatureKey::Orders,
        FeatureKey::OrderStatus,
        FeatureKey::Kitchen,
        FeatureKey::Requests,
        FeatureKey::TipManagement,
        FeatureKey::TipReports,
        FeatureKey::Analytics,
        FeatureKey::Feedback,
        FeatureKey::Crm,
        FeatureKey::Pos,
        FeatureKey::TokenManagement,
        FeatureKey::Staff,
        FeatureKey::Subscription,
        FeatureKey::Branding,
        FeatureKey::ActivityLogs,
        FeatureKey::DemoAccounts,
        FeatureKey::FeatureFlags,
        FeatureKey::Addons,
        FeatureKey::DeleteData,
        FeatureKey::ClearTable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::Dashboard => "dashboard",
            FeatureKey::Menu => "menu",
            FeatureKey::Tables => "tables",
            FeatureKey::Orders => "orders",
            FeatureKey::OrderStatus => "order-status",
            FeatureKey::Kitchen => "kitchen",
            FeatureKey::Requests => "requests",
            FeatureKey::TipManagement => "tip-management",
            FeatureKey::TipReports => "tip-reports",
            FeatureKey::Analytics => "analytics",
            FeatureKey::Feedback => "feedback",
            FeatureKey::Crm => "crm",
            FeatureKey::Pos => "pos",
            FeatureKey::TokenManagement => "token-management",
            FeatureKey::Staff => "staff",
            FeatureKey::Subscription => "subscription",
            FeatureKey::Branding => "branding",
            FeatureKey::ActivityLogs => "activity-logs",
            FeatureKey::DemoAccounts => "demo-accounts",
            FeatureKey::FeatureFlags => "feature-flags",
            FeatureKey::Addons => "addons",
            FeatureKey::DeleteData => "delete-data",
            FeatureKey::ClearTable => "clear-table",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept snake_case spellings as well as the canonical kebab-case.
        let norm = s.trim().to_ascii_lowercase().replace('_', "-");
        FeatureKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == norm)
            .ok_or_else(|| ParseError::UnknownFeature(s.to_string()))
    }
}

/// One level per feature key. Keys that were never given a level read as
/// `none`; there is no "unknown" state that could be mistaken for an allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet {
    levels: [PermissionLevel; FeatureKey::COUNT],
}

impl PermissionSet {
    /// A set where every feature is `none`.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a set from explicit entries; unlisted features stay `none`.
    /// Later entries for the same key win.
    pub fn from_entries(entries: &[(FeatureKey, PermissionLevel)]) -> Self {
        let mut set = Self::none();
        for (key, level) in entries {
            set.levels[key.index()] = *level;
        }
        set
    }

    pub fn get(&self, feature: FeatureKey) -> PermissionLevel {
        self.levels
            .get(feature.index())
            .copied()
            .unwrap_or(PermissionLevel::None)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, PermissionLevel)> + '_ {
        FeatureKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    /// Whether this set grants at least `required` on `feature` under the
    /// comparison rule of [`PermissionLevel::satisfies`].
    pub fn allows(&self, feature: FeatureKey, required: PermissionLevel) -> bool {
        self.get(feature).satisfies(required)
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FeatureKey::COUNT))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k.as_str(), v.as_str())?;
        }
        map.end()
    }
}

/// Permission check against a possibly absent user. No user means no access.
pub fn has_permission(user: Option<&User>, feature: FeatureKey, required: PermissionLevel) -> bool {
    match user {
        Some(u) => u.permissions.allows(feature, required),
        None => false,
    }
}
