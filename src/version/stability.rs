//! Package stability levels and visibility filtering

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maturity level of a release, ordered from least to most stable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Dev,
    Alpha,
    Beta,
    #[serde(rename = "RC")]
    RC,
    Stable,
}

impl Stability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stability::Dev => "dev",
            Stability::Alpha => "alpha",
            Stability::Beta => "beta",
            Stability::RC => "RC",
            Stability::Stable => "stable",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stability {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Stability::Dev),
            "alpha" | "a" => Ok(Stability::Alpha),
            "beta" | "b" => Ok(Stability::Beta),
            "rc" => Ok(Stability::RC),
            "stable" => Ok(Stability::Stable),
            _ => Err(()),
        }
    }
}

/// Decides which packages are visible to pool queries
///
/// Mirrors the project's `minimum-stability` setting plus per-package
/// overrides taken from requirement constraints such as `^2.0@beta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityFilter {
    minimum: Stability,
    flags: HashMap<String, Stability>,
}

impl StabilityFilter {
    pub fn new(minimum: Stability, flags: HashMap<String, Stability>) -> Self {
        let flags = flags
            .into_iter()
            .map(|(name, stability)| (name.to_ascii_lowercase(), stability))
            .collect();
        Self { minimum, flags }
    }

    /// Filter that lets every package through
    pub fn allow_all() -> Self {
        Self::new(Stability::Dev, HashMap::new())
    }

    pub fn minimum(&self) -> Stability {
        self.minimum
    }

    /// Least stable level accepted for the given package
    pub fn accepted(&self, name: &str) -> Stability {
        self.flags
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.minimum)
    }

    pub fn is_visible(&self, name: &str, stability: Stability) -> bool {
        stability >= self.accepted(name)
    }
}

impl Default for StabilityFilter {
    fn default() -> Self {
        Self::new(Stability::Stable, HashMap::new())
    }
}
