use thiserror::Error;

use super::{FeatureKey, Role};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
    #[error("unknown permission level: {0}")]
    UnknownLevel(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("role {0} has no permission set")]
    MissingRole(Role),
    #[error("role {0} is listed more than once")]
    DuplicateRole(Role),
    #[error("role {role} has no level for feature {feature}")]
    MissingFeature { role: Role, feature: FeatureKey },
    #[error("role {role} lists feature {feature} more than once")]
    DuplicateFeature { role: Role, feature: FeatureKey },
}

/// Outcome of a failed identity provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("identity provider response could not be decoded: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Transport-level failures, as opposed to the provider answering "no".
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Unreachable(_))
    }
}
