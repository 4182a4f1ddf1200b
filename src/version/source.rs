//! Package sources that answer "what provides" queries

use std::process::Command;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, warn};

use crate::version::constraint::VersionConstraint;
use crate::version::package::Package;
use crate::version::types::PackageRecord;

/// Prints one `name version` line per platform package
const PHP_PROBE_SCRIPT: &str = r#"echo "php ", PHP_VERSION, PHP_EOL;
if (PHP_INT_SIZE === 8) { echo "php-64bit ", PHP_VERSION, PHP_EOL; }
foreach (get_loaded_extensions() as $name) {
    echo "ext-", strtolower(str_replace(" ", "-", $name)), " ", phpversion($name) ?: "0", PHP_EOL;
}"#;

static LEADING_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+){0,3}").expect("version prefix pattern is valid"));

/// Anything that can list the packages satisfying a name and constraint
///
/// The returned order carries no meaning; callers select explicitly.
pub trait PackageSource: Send + Sync {
    /// Query packages named `name` (or, unless `exact_name`, providing or replacing it)
    /// whose version satisfies `constraint`. `None` means any version.
    fn query(
        &self,
        name: &str,
        constraint: Option<&VersionConstraint>,
        exact_name: bool,
    ) -> Vec<Package>;
}

/// In-memory package source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayRepository {
    packages: Vec<Package>,
}

impl ArrayRepository {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }

    pub fn from_records(records: &[PackageRecord]) -> Self {
        Self::new(records.iter().map(PackageRecord::to_package).collect())
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageSource for ArrayRepository {
    fn query(
        &self,
        name: &str,
        constraint: Option<&VersionConstraint>,
        exact_name: bool,
    ) -> Vec<Package> {
        self.packages
            .iter()
            .filter(|package| package.satisfies(name, constraint, exact_name))
            .cloned()
            .collect()
    }
}

/// Synthetic source describing the runtime platform (`php`, `ext-*`, ...)
#[derive(Debug, Clone, Default)]
pub struct PlatformRepository {
    inner: ArrayRepository,
}

impl PlatformRepository {
    /// Build from detected packages, with manifest overrides taking precedence
    ///
    /// An override of `None` (`"ext-foo": false` in the manifest) hides the package.
    pub fn new(detected: Vec<Package>, overrides: &IndexMap<String, Option<String>>) -> Self {
        let mut packages: Vec<Package> = detected
            .into_iter()
            .filter(|package| {
                !overrides
                    .keys()
                    .any(|name| name.eq_ignore_ascii_case(&package.name))
            })
            .collect();

        packages.extend(overrides.iter().filter_map(|(name, version)| {
            version
                .as_deref()
                .map(|version| Package::new(&name.to_ascii_lowercase(), version))
        }));

        debug!("Platform repository holds {} packages", packages.len());

        Self {
            inner: ArrayRepository::new(packages),
        }
    }

    /// Ask a PHP binary for its version and loaded extensions
    ///
    /// Returns no packages when the binary is missing or fails.
    pub fn detect(php_binary: &str) -> Vec<Package> {
        let output = match Command::new(php_binary)
            .args(["-r", PHP_PROBE_SCRIPT])
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                warn!(
                    "Platform probe `{}` exited with {}: {}",
                    php_binary,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return Vec::new();
            }
            Err(e) => {
                debug!("Platform probe `{}` unavailable: {}", php_binary, e);
                return Vec::new();
            }
        };

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    pub fn packages(&self) -> &[Package] {
        self.inner.packages()
    }
}

impl PackageSource for PlatformRepository {
    fn query(
        &self,
        name: &str,
        constraint: Option<&VersionConstraint>,
        exact_name: bool,
    ) -> Vec<Package> {
        self.inner.query(name, constraint, exact_name)
    }
}

fn parse_probe_output(output: &str) -> Vec<Package> {
    output
        .lines()
        .filter_map(|line| line.trim().split_once(' '))
        .map(|(name, version)| {
            // "8.3.1-1+ubuntu22.04" -> "8.3.1"
            let version = LEADING_VERSION_RE
                .find(version.trim())
                .map_or("0", |m| m.as_str());
            Package::new(name, version)
        })
        .collect()
}
