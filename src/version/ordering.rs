//! Version tokens and their total ordering
//!
//! Versions are normalised to four numeric segments plus an optional
//! pre-release modifier, or to a named branch (`dev-main`).
//!
//! Examples:
//! - "1.2" -> 1.2.0.0
//! - "v2.0.0-beta2" -> 2.0.0.0-beta2
//! - "1.x-dev" -> 1.9999999.9999999.9999999-dev
//! - "dev-main" -> dev-main

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::version::error::ParseVersionError;
use crate::version::stability::Stability;

/// Segment value used for wildcard positions of numeric branches (`1.x-dev`)
pub const BRANCH_SEGMENT: u64 = 9_999_999;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^v?(\d+)(?:\.(\d+|[x*]))?(?:\.(\d+|[x*]))?(?:\.(\d+|[x*]))?(?:[._-]?(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*))?([.-]?dev)?$",
    )
    .expect("version pattern is valid")
});

/// Pre-release or post-release marker, ordered `dev < alpha < beta < RC < release < patch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Dev,
    Alpha(Option<u64>),
    Beta(Option<u64>),
    RC(Option<u64>),
    Release,
    Patch(Option<u64>),
}

impl Modifier {
    fn parse(label: &str, number: &str) -> Self {
        let number = number
            .split(['.', '-'])
            .find(|part| !part.is_empty())
            .and_then(|part| part.parse::<u64>().ok());

        match label.to_ascii_lowercase().as_str() {
            "alpha" | "a" => Modifier::Alpha(number),
            "beta" | "b" => Modifier::Beta(number),
            "rc" => Modifier::RC(number),
            "patch" | "pl" | "p" => Modifier::Patch(number),
            _ => Modifier::Release,
        }
    }

    fn stability(&self) -> Stability {
        match self {
            Modifier::Dev => Stability::Dev,
            Modifier::Alpha(_) => Stability::Alpha,
            Modifier::Beta(_) => Stability::Beta,
            Modifier::RC(_) => Stability::RC,
            Modifier::Release | Modifier::Patch(_) => Stability::Stable,
        }
    }
}

/// A normalised version token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// Numeric release line, optionally a pre-release or a `-dev` snapshot of it
    Release {
        segments: [u64; 4],
        modifier: Modifier,
        snapshot: bool,
    },
    /// Named VCS branch (`dev-main`)
    Branch(String),
}

impl Version {
    /// Create a plain release version from numeric segments
    pub fn new(segments: [u64; 4]) -> Self {
        Version::Release {
            segments,
            modifier: Modifier::Release,
            snapshot: false,
        }
    }

    /// Create the `-dev` snapshot of the given release line
    pub fn dev(segments: [u64; 4]) -> Self {
        Version::Release {
            segments,
            modifier: Modifier::Dev,
            snapshot: false,
        }
    }

    /// Parse and normalise a version string
    pub fn parse(input: &str) -> Result<Self, ParseVersionError> {
        let error = || ParseVersionError(input.to_string());

        let mut version = input.trim();
        // Inline aliases ("1.0 as 2.0") resolve to the aliased-from version
        if let Some((actual, _alias)) = version.split_once(" as ") {
            version = actual.trim();
        }
        if let Some((actual, _flag)) = version.split_once('@') {
            version = actual.trim();
        }
        if version.is_empty() {
            return Err(error());
        }

        if let Some(branch) = version.strip_prefix("dev-") {
            if branch.is_empty() {
                return Err(error());
            }
            return Ok(Version::Branch(branch.to_string()));
        }

        if matches!(version, "master" | "trunk" | "default") {
            return Ok(Version::Branch(version.to_string()));
        }

        if let Some(captures) = VERSION_RE.captures(version) {
            let is_dev = captures.get(7).is_some();
            let mut segments = [0u64; 4];
            let mut wildcard = false;

            for (index, segment) in segments.iter_mut().enumerate() {
                let Some(part) = captures.get(index + 1) else {
                    if wildcard {
                        *segment = BRANCH_SEGMENT;
                    }
                    continue;
                };
                match part.as_str() {
                    "x" | "X" | "*" => {
                        wildcard = true;
                        *segment = BRANCH_SEGMENT;
                    }
                    // "1.x.3" is not a meaningful branch name
                    _ if wildcard => return Err(error()),
                    digits => *segment = digits.parse().map_err(|_| error())?,
                }
            }

            if wildcard && !is_dev {
                return Err(error());
            }

            let modifier = captures
                .get(5)
                .map(|label| {
                    Modifier::parse(
                        label.as_str(),
                        captures.get(6).map(|m| m.as_str()).unwrap_or(""),
                    )
                })
                .unwrap_or(Modifier::Release);

            return Ok(match (modifier, is_dev) {
                (Modifier::Release, true) => Version::dev(segments),
                (modifier, snapshot) => Version::Release {
                    segments,
                    modifier,
                    snapshot,
                },
            });
        }

        // "feature-dev" is the branch "feature"
        if let Some(branch) = version.strip_suffix("-dev")
            && !branch.is_empty()
        {
            return Ok(Version::Branch(branch.to_string()));
        }

        Err(error())
    }

    /// Parse a version token coming from package metadata
    ///
    /// Tokens that cannot be normalised become branch versions, which keeps
    /// the ordering total over arbitrary input.
    pub fn from_token(token: &str) -> Self {
        Self::parse(token).unwrap_or_else(|_| {
            let name = token.trim();
            Version::Branch(name.strip_prefix("dev-").unwrap_or(name).to_string())
        })
    }

    pub fn stability(&self) -> Stability {
        match self {
            Version::Branch(_) => Stability::Dev,
            Version::Release { snapshot: true, .. } => Stability::Dev,
            Version::Release { modifier, .. } => modifier.stability(),
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Version::Branch(_))
    }

    pub fn segments(&self) -> Option<[u64; 4]> {
        match self {
            Version::Release { segments, .. } => Some(*segments),
            Version::Branch(_) => None,
        }
    }

    /// Same release line with its modifier replaced by `-dev`, used as an inclusive lower bound
    pub fn as_dev_bound(&self) -> Self {
        match self {
            Version::Release {
                segments,
                modifier: Modifier::Release,
                snapshot: false,
            } => Version::dev(*segments),
            other => other.clone(),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::Branch(a), Version::Branch(b)) => a.cmp(b),
            (Version::Branch(_), Version::Release { .. }) => Ordering::Less,
            (Version::Release { .. }, Version::Branch(_)) => Ordering::Greater,
            (
                Version::Release {
                    segments: a,
                    modifier: ma,
                    snapshot: sa,
                },
                Version::Release {
                    segments: b,
                    modifier: mb,
                    snapshot: sb,
                },
            ) => a
                .cmp(b)
                .then_with(|| ma.cmp(mb))
                // a snapshot precedes the release it leads up to
                .then_with(|| sb.cmp(sa)),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Branch(name) => write!(f, "dev-{}", name),
            Version::Release {
                segments,
                modifier,
                snapshot,
            } => {
                write!(
                    f,
                    "{}.{}.{}.{}",
                    segments[0], segments[1], segments[2], segments[3]
                )?;
                let number = |n: &Option<u64>| n.map(|n| n.to_string()).unwrap_or_default();
                match modifier {
                    Modifier::Dev => f.write_str("-dev")?,
                    Modifier::Alpha(n) => write!(f, "-alpha{}", number(n))?,
                    Modifier::Beta(n) => write!(f, "-beta{}", number(n))?,
                    Modifier::RC(n) => write!(f, "-RC{}", number(n))?,
                    Modifier::Patch(n) => write!(f, "-patch{}", number(n))?,
                    Modifier::Release => {}
                }
                if *snapshot {
                    f.write_str("-dev")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Compare two raw version tokens under the total version ordering
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::from_token(a).cmp(&Version::from_token(b))
}
