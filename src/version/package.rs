//! Resolved package snapshots

use std::sync::LazyLock;

use regex::Regex;

use crate::version::constraint::VersionConstraint;
use crate::version::ordering::Version;
use crate::version::stability::Stability;

static PLATFORM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:php(?:-64bit|-ipv6|-zts|-debug)?|hhvm|(?:ext|lib)-[a-z0-9](?:[_.-]?[a-z0-9]+)*|composer(?:-(?:plugin|runtime)-api)?)$")
        .expect("platform pattern is valid")
});

/// Whether a requirement targets the runtime platform rather than an installable package
pub fn is_platform_name(name: &str) -> bool {
    PLATFORM_NAME_RE.is_match(name)
}

/// A `provide` or `replace` entry of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Name of the package being provided or replaced
    pub target: String,
    /// Exact provided version, `None` when the link declares a range
    pub version: Option<Version>,
}

impl Link {
    pub fn new(target: &str, version: Option<Version>) -> Self {
        Self {
            target: target.to_string(),
            version,
        }
    }

    fn satisfies(&self, name: &str, constraint: Option<&VersionConstraint>) -> bool {
        if !self.target.eq_ignore_ascii_case(name) {
            return false;
        }
        match (constraint, &self.version) {
            (Some(constraint), Some(version)) => constraint.matches(version),
            _ => true,
        }
    }
}

/// A single resolvable package version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// Normalised version used for ordering and matching
    pub version: Version,
    /// Version as published, used for display
    pub pretty_version: String,
    /// VCS commit the package was built from
    pub reference: Option<String>,
    pub provides: Vec<Link>,
    pub replaces: Vec<Link>,
}

impl Package {
    pub fn new(name: &str, pretty_version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: Version::from_token(pretty_version),
            pretty_version: pretty_version.to_string(),
            reference: None,
            provides: Vec::new(),
            replaces: Vec::new(),
        }
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn with_provide(mut self, link: Link) -> Self {
        self.provides.push(link);
        self
    }

    pub fn with_replace(mut self, link: Link) -> Self {
        self.replaces.push(link);
        self
    }

    pub fn stability(&self) -> Stability {
        self.version.stability()
    }

    /// Development packages track a branch rather than a tagged release
    pub fn is_dev(&self) -> bool {
        self.stability() == Stability::Dev
    }

    pub fn is_platform(&self) -> bool {
        is_platform_name(&self.name)
    }

    /// First `len` characters of the VCS reference
    pub fn short_reference(&self, len: usize) -> Option<String> {
        self.reference
            .as_deref()
            .map(|reference| reference.chars().take(len).collect())
    }

    /// Whether this package answers a query for `name`, by its own name or through provide/replace links
    pub fn satisfies(
        &self,
        name: &str,
        constraint: Option<&VersionConstraint>,
        exact_name: bool,
    ) -> bool {
        if self.name.eq_ignore_ascii_case(name) {
            return constraint.is_none_or(|c| c.matches(&self.version));
        }
        if exact_name {
            return false;
        }
        self.provides
            .iter()
            .chain(self.replaces.iter())
            .any(|link| link.satisfies(name, constraint))
    }
}
