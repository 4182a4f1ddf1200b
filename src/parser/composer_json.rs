//! composer.json parser

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{CheckConfig, EXTRA_CONFIG_KEY};
use crate::parser::error::ManifestError;
use crate::parser::types::Requirement;
use crate::version::constraint::extract_stability_flag;
use crate::version::stability::{Stability, StabilityFilter};
use crate::version::types::deserialize_links;

const DEFAULT_VENDOR_DIR: &str = "vendor";

/// Repository keys that refer to the default public repository
const PACKAGIST_KEYS: [&str; 2] = ["packagist.org", "packagist"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawManifest {
    name: Option<String>,
    #[serde(deserialize_with = "deserialize_links")]
    require: IndexMap<String, String>,
    #[serde(rename = "require-dev", deserialize_with = "deserialize_links")]
    require_dev: IndexMap<String, String>,
    #[serde(rename = "minimum-stability")]
    minimum_stability: Option<String>,
    config: RawConfig,
    repositories: Value,
    extra: IndexMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    platform: IndexMap<String, Value>,
    #[serde(rename = "vendor-dir")]
    vendor_dir: Option<String>,
}

/// The project's composer.json, reduced to what a check needs
#[derive(Debug, Clone, PartialEq)]
pub struct RootManifest {
    pub name: Option<String>,
    /// `require` entries in declaration order
    pub requires: Vec<Requirement>,
    /// `require-dev` entries in declaration order
    pub dev_requires: Vec<Requirement>,
    pub minimum_stability: Stability,
    /// Per-package stability derived from requirement constraints, keyed by lowercase name
    pub stability_flags: HashMap<String, Stability>,
    /// `config.platform`; `None` hides a platform package
    pub platform_overrides: IndexMap<String, Option<String>>,
    /// Relative to the manifest's directory
    pub vendor_dir: PathBuf,
    /// URLs of extra `composer` repositories
    pub repositories: Vec<String>,
    pub packagist_enabled: bool,
    pub config: CheckConfig,
}

impl RootManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded manifest {}", path.display());
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_json::from_str(content)?;

        let minimum_stability = match &raw.minimum_stability {
            Some(value) => value
                .parse::<Stability>()
                .map_err(|_| ManifestError::InvalidStability(value.clone()))?,
            None => Stability::Stable,
        };

        let requires = parse_requirements(&raw.require)?;
        let dev_requires = parse_requirements(&raw.require_dev)?;

        let stability_flags = raw
            .require
            .iter()
            .chain(raw.require_dev.iter())
            .filter_map(|(name, constraint)| {
                extract_stability_flag(constraint, minimum_stability)
                    .map(|flag| (name.to_ascii_lowercase(), flag))
            })
            .fold(HashMap::new(), |mut flags, (name, flag)| {
                flags
                    .entry(name)
                    .and_modify(|current: &mut Stability| *current = (*current).min(flag))
                    .or_insert(flag);
                flags
            });

        let platform_overrides = raw
            .config
            .platform
            .iter()
            .filter_map(|(name, value)| match value {
                Value::String(version) => Some((name.clone(), Some(version.clone()))),
                Value::Bool(false) => Some((name.clone(), None)),
                other => {
                    warn!("Ignoring platform override {}: {}", name, other);
                    None
                }
            })
            .collect();

        let (repositories, packagist_enabled) = parse_repositories(&raw.repositories);

        let config = match raw.extra.get(EXTRA_CONFIG_KEY) {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(ManifestError::InvalidConfig)?
            }
            None => CheckConfig::default(),
        };

        Ok(Self {
            name: raw.name,
            requires,
            dev_requires,
            minimum_stability,
            stability_flags,
            platform_overrides,
            vendor_dir: PathBuf::from(
                raw.config
                    .vendor_dir
                    .as_deref()
                    .unwrap_or(DEFAULT_VENDOR_DIR),
            ),
            repositories,
            packagist_enabled,
            config,
        })
    }

    pub fn stability_filter(&self) -> StabilityFilter {
        StabilityFilter::new(self.minimum_stability, self.stability_flags.clone())
    }

    /// Requirements to check, `require` first
    pub fn requirements(&self, include_dev: bool) -> Vec<Requirement> {
        let mut requirements = self.requires.clone();
        if include_dev {
            requirements.extend(self.dev_requires.iter().cloned());
        }
        requirements
    }
}

fn parse_requirements(entries: &IndexMap<String, String>) -> Result<Vec<Requirement>, ManifestError> {
    entries
        .iter()
        .map(|(name, constraint)| {
            Requirement::parse(name, constraint).map_err(|source| ManifestError::InvalidRequirement {
                name: name.clone(),
                source,
            })
        })
        .collect()
}

/// Collect composer repository URLs and whether the default repository stays enabled
///
/// `repositories` is either a list of repository objects or an object keyed by
/// repository name. Either form may disable the default one with `"packagist.org": false`.
fn parse_repositories(value: &Value) -> (Vec<String>, bool) {
    let entries: Vec<(Option<&str>, &Value)> = match value {
        Value::Array(items) => items.iter().map(|item| (None, item)).collect(),
        Value::Object(map) => map.iter().map(|(key, item)| (Some(key.as_str()), item)).collect(),
        _ => Vec::new(),
    };

    let mut urls = Vec::new();
    let mut packagist_enabled = true;

    for (key, entry) in entries {
        if key.is_some_and(|key| PACKAGIST_KEYS.contains(&key)) && entry == &Value::Bool(false) {
            packagist_enabled = false;
            continue;
        }

        let Value::Object(object) = entry else {
            continue;
        };

        if PACKAGIST_KEYS
            .iter()
            .any(|name| object.get(*name) == Some(&Value::Bool(false)))
        {
            packagist_enabled = false;
            continue;
        }

        match (
            object.get("type").and_then(Value::as_str),
            object.get("url").and_then(Value::as_str),
        ) {
            (Some("composer"), Some(url)) => urls.push(url.trim_end_matches('/').to_string()),
            (kind, _) => debug!("Skipping repository of type {:?}", kind),
        }
    }

    (urls, packagist_enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpToDatePolicy;

    #[test]
    fn parse_keeps_requirement_declaration_order() {
        let manifest = RootManifest::parse(
            r#"{
                "require": {
                    "php": ">=8.1",
                    "zeta/last": "^1.0",
                    "acme/widget": "~2.3"
                },
                "require-dev": {
                    "phpunit/phpunit": "^10.5"
                }
            }"#,
        )
        .unwrap();

        let requirements = manifest.requirements(false);
        let targets: Vec<&str> = requirements
            .iter()
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["php", "zeta/last", "acme/widget"]);

        let with_dev = manifest.requirements(true);
        assert_eq!(with_dev.len(), 4);
        assert_eq!(with_dev[3].target, "phpunit/phpunit");
        assert_eq!(with_dev[3].constraint.pretty(), "^10.5");
    }

    #[test]
    fn parse_applies_defaults_for_minimal_manifest() {
        let manifest = RootManifest::parse("{}").unwrap();

        assert_eq!(manifest.name, None);
        assert!(manifest.requires.is_empty());
        assert_eq!(manifest.minimum_stability, Stability::Stable);
        assert_eq!(manifest.vendor_dir, PathBuf::from("vendor"));
        assert!(manifest.packagist_enabled);
        assert!(manifest.repositories.is_empty());
        assert_eq!(manifest.config, CheckConfig::default());
    }

    #[test]
    fn parse_accepts_empty_require_list() {
        let manifest = RootManifest::parse(r#"{"require": []}"#).unwrap();

        assert!(manifest.requires.is_empty());
    }

    #[test]
    fn parse_derives_stability_flags() {
        let manifest = RootManifest::parse(
            r#"{
                "minimum-stability": "beta",
                "require": {
                    "acme/explicit": "^1.0@dev",
                    "acme/inline": "2.0.0-alpha1",
                    "acme/within": "^1.0@rc",
                    "acme/stable": "^1.0"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.minimum_stability, Stability::Beta);
        assert_eq!(
            manifest.stability_flags.get("acme/explicit"),
            Some(&Stability::Dev)
        );
        assert_eq!(
            manifest.stability_flags.get("acme/inline"),
            Some(&Stability::Alpha)
        );
        assert_eq!(manifest.stability_flags.get("acme/stable"), None);

        let filter = manifest.stability_filter();
        assert!(filter.is_visible("acme/explicit", Stability::Dev));
        assert!(!filter.is_visible("acme/stable", Stability::Alpha));
    }

    #[test]
    fn parse_rejects_unknown_minimum_stability() {
        let result = RootManifest::parse(r#"{"minimum-stability": "nightly"}"#);

        assert!(matches!(result, Err(ManifestError::InvalidStability(value)) if value == "nightly"));
    }

    #[test]
    fn parse_rejects_invalid_requirement_constraint() {
        let result = RootManifest::parse(r#"{"require": {"acme/widget": "not a version"}}"#);

        assert!(
            matches!(result, Err(ManifestError::InvalidRequirement { name, .. }) if name == "acme/widget")
        );
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(matches!(
            RootManifest::parse("{"),
            Err(ManifestError::Json(_))
        ));
    }

    #[test]
    fn parse_reads_platform_overrides_and_vendor_dir() {
        let manifest = RootManifest::parse(
            r#"{
                "config": {
                    "platform": { "php": "8.1.2", "ext-mongodb": false, "ext-bad": 3 },
                    "vendor-dir": "lib/vendor"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            manifest.platform_overrides,
            IndexMap::from([
                ("php".to_string(), Some("8.1.2".to_string())),
                ("ext-mongodb".to_string(), None),
            ])
        );
        assert_eq!(manifest.vendor_dir, PathBuf::from("lib/vendor"));
    }

    #[test]
    fn parse_collects_composer_repositories_from_list() {
        let manifest = RootManifest::parse(
            r#"{
                "repositories": [
                    { "type": "composer", "url": "https://packages.example.com/" },
                    { "type": "vcs", "url": "https://github.com/acme/widget" },
                    { "packagist.org": false }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.repositories, vec!["https://packages.example.com"]);
        assert!(!manifest.packagist_enabled);
    }

    #[test]
    fn parse_collects_composer_repositories_from_object() {
        let manifest = RootManifest::parse(
            r#"{
                "repositories": {
                    "private": { "type": "composer", "url": "https://private.example.com" },
                    "packagist.org": false
                }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.repositories, vec!["https://private.example.com"]);
        assert!(!manifest.packagist_enabled);
    }

    #[test]
    fn parse_reads_check_updates_extra_config() {
        let manifest = RootManifest::parse(
            r#"{
                "extra": {
                    "check-updates": {
                        "policy": { "upToDate": "always" },
                        "platform": { "probe": false }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.config.policy.up_to_date, UpToDatePolicy::Always);
        assert!(manifest.config.policy.report_anomalies);
        assert!(!manifest.config.platform.probe);
    }

    #[test]
    fn parse_rejects_invalid_check_updates_config() {
        let result = RootManifest::parse(
            r#"{"extra": {"check-updates": {"policy": {"upToDate": "sometimes"}}}}"#,
        );

        assert!(matches!(result, Err(ManifestError::InvalidConfig(_))));
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composer.json");

        let result = RootManifest::load(&path);

        assert!(matches!(result, Err(ManifestError::Io { path: p, .. }) if p == path));
    }
}
