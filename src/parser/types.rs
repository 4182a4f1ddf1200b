//! Common types for manifest parsing

use crate::version::constraint::VersionConstraint;
use crate::version::error::ParseConstraintError;

/// A dependency declared by the root project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Package name (e.g., "monolog/monolog", "php", "ext-json")
    pub target: String,
    /// Accepted versions as declared
    pub constraint: VersionConstraint,
}

impl Requirement {
    pub fn new(target: &str, constraint: VersionConstraint) -> Self {
        Self {
            target: target.to_string(),
            constraint,
        }
    }

    pub fn parse(target: &str, constraint: &str) -> Result<Self, ParseConstraintError> {
        Ok(Self::new(target, VersionConstraint::parse(constraint)?))
    }
}
