//! Version lookup and classification for declared requirements

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::parser::types::Requirement;
use crate::version::package::Package;
use crate::version::source::PackageSource;

/// Number of reference characters shown for development packages
pub const REFERENCE_DISPLAY_LEN: usize = 10;

/// Which lookup came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundTier {
    /// Nothing installed satisfies the requirement
    Local,
    /// No known package satisfies the declared constraint
    GlobalConstrained,
    /// The package name is unknown to every configured source
    GlobalUnconstrained,
}

/// Best package per lookup for one requirement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTriple {
    /// Best installed package satisfying the constraint
    pub current: Option<Package>,
    /// Best known package satisfying the constraint
    pub constrained: Option<Package>,
    /// Best known package under no constraint
    pub latest: Option<Package>,
}

/// Relationship between the current, constrained-best and latest versions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Current equals both the constrained best and the latest version
    pub up_to_date: bool,
    /// A newer version is reachable without touching the constraint
    pub update_available: bool,
    /// Reaching the latest version requires loosening the constraint
    pub upgrade_available: bool,
    /// The installed version ranks above the constrained best, usually stale metadata
    pub anomalous: bool,
}

/// Result of checking a single requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRequirement {
    pub target: String,
    /// Constraint as declared
    pub required: String,
    pub current: String,
    pub constrained: String,
    pub latest: String,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    NotFound { target: String, tier: NotFoundTier },
    Resolved(ResolvedRequirement),
}

impl CheckOutcome {
    pub fn target(&self) -> &str {
        match self {
            CheckOutcome::NotFound { target, .. } => target,
            CheckOutcome::Resolved(resolved) => &resolved.target,
        }
    }
}

/// Pick the highest version; among equal maxima the last one wins
pub fn select_best(packages: Vec<Package>) -> Option<Package> {
    packages
        .into_iter()
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Run the three independent lookups for a requirement
pub fn lookup_triple(
    local: &dyn PackageSource,
    global: &dyn PackageSource,
    requirement: &Requirement,
) -> VersionTriple {
    let constraint = Some(&requirement.constraint);

    VersionTriple {
        current: select_best(local.query(&requirement.target, constraint, true)),
        constrained: select_best(global.query(&requirement.target, constraint, true)),
        latest: select_best(global.query(&requirement.target, None, true)),
    }
}

/// Compare the selected versions of a requirement
pub fn classify(current: &Package, constrained: &Package, latest: &Package) -> Classification {
    let cmp_constrained = current.version.cmp(&constrained.version);
    let cmp_latest = constrained.version.cmp(&latest.version);

    Classification {
        up_to_date: cmp_constrained == Ordering::Equal && cmp_latest == Ordering::Equal,
        update_available: cmp_constrained == Ordering::Less,
        upgrade_available: cmp_latest == Ordering::Less,
        anomalous: cmp_constrained == Ordering::Greater,
    }
}

/// Version identifiers to show for a requirement
///
/// Development packages carry no meaningful version numbers, so when the
/// installed package is one, all three columns show shortened VCS references.
fn display_identifiers(current: &Package, constrained: &Package, latest: &Package) -> [String; 3] {
    let identify = |package: &Package| {
        if current.is_dev() {
            package
                .short_reference(REFERENCE_DISPLAY_LEN)
                .unwrap_or_else(|| package.pretty_version.clone())
        } else {
            package.pretty_version.clone()
        }
    };

    [identify(current), identify(constrained), identify(latest)]
}

/// Check a single requirement against the local and global sources
pub fn check_requirement(
    local: &dyn PackageSource,
    global: &dyn PackageSource,
    requirement: &Requirement,
) -> CheckOutcome {
    let triple = lookup_triple(local, global, requirement);

    let not_found = |tier| CheckOutcome::NotFound {
        target: requirement.target.clone(),
        tier,
    };

    // A name unknown to every source is reported as such ahead of the per-tier checks
    let (current, constrained, latest) = match (triple.current, triple.constrained, triple.latest) {
        (Some(current), Some(constrained), Some(latest)) => (current, constrained, latest),
        (_, _, None) => return not_found(NotFoundTier::GlobalUnconstrained),
        (None, _, _) => return not_found(NotFoundTier::Local),
        (_, None, _) => return not_found(NotFoundTier::GlobalConstrained),
    };

    if constrained.version > latest.version {
        warn!(
            "{}: constrained best {} ranks above latest {}",
            requirement.target, constrained.version, latest.version
        );
    }

    let classification = classify(&current, &constrained, &latest);
    let [current, constrained, latest] = display_identifiers(&current, &constrained, &latest);

    debug!(
        "{} {}: current={} constrained={} latest={} {:?}",
        requirement.target,
        requirement.constraint,
        current,
        constrained,
        latest,
        classification
    );

    CheckOutcome::Resolved(ResolvedRequirement {
        target: requirement.target.clone(),
        required: requirement.constraint.pretty().to_string(),
        current,
        constrained,
        latest,
        classification,
    })
}

/// Check every requirement, keeping declaration order
pub fn check_requirements(
    local: &dyn PackageSource,
    global: &dyn PackageSource,
    requirements: &[Requirement],
) -> Vec<CheckOutcome> {
    info!("Checking {} requirements", requirements.len());

    requirements
        .iter()
        .map(|requirement| check_requirement(local, global, requirement))
        .collect()
}
