//! Serialized package metadata shared by `installed.json`, repository responses and the cache

use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::version::ordering::Version;
use crate::version::package::{Link, Package};

/// VCS pointer of a `dist` or `source` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// One package version as published in repository metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_normalized: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<SourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceReference>,
    #[serde(
        default,
        deserialize_with = "deserialize_links",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub provide: IndexMap<String, String>,
    #[serde(
        default,
        deserialize_with = "deserialize_links",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub replace: IndexMap<String, String>,
}

impl PackageRecord {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            version_normalized: None,
            dist: None,
            source: None,
            provide: IndexMap::new(),
            replace: IndexMap::new(),
        }
    }

    pub fn with_dist_reference(mut self, reference: &str) -> Self {
        self.dist = Some(SourceReference {
            reference: Some(reference.to_string()),
        });
        self
    }

    /// Convert the metadata into a queryable package
    ///
    /// The dist reference is preferred over the source reference, matching
    /// what ends up installed on disk.
    pub fn to_package(&self) -> Package {
        let version = Version::from_token(
            self.version_normalized
                .as_deref()
                .unwrap_or(self.version.as_str()),
        );

        let reference = [&self.dist, &self.source]
            .into_iter()
            .flatten()
            .find_map(|source| source.reference.clone())
            .filter(|reference| !reference.is_empty());

        let links = |entries: &IndexMap<String, String>| -> Vec<Link> {
            entries
                .iter()
                .map(|(target, constraint)| {
                    let provided = match constraint.trim() {
                        "self.version" => Some(version.clone()),
                        other => Version::parse(other.trim_start_matches('=')).ok(),
                    };
                    Link::new(target, provided)
                })
                .collect()
        };

        Package {
            name: self.name.clone(),
            version: version.clone(),
            pretty_version: self.version.clone(),
            reference,
            provides: links(&self.provide),
            replaces: links(&self.replace),
        }
    }
}

/// Link maps are serialized as `[]` when empty
pub(crate) fn deserialize_links<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Links {
        Map(IndexMap<String, String>),
        List(Vec<IgnoredAny>),
    }

    Ok(match Option::<Links>::deserialize(deserializer)? {
        Some(Links::Map(map)) => map,
        Some(Links::List(entries)) => {
            if !entries.is_empty() {
                debug!("Ignoring {} link entries in list form", entries.len());
            }
            IndexMap::new()
        }
        None => IndexMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn package_record_deserializes_repository_entry() {
        let record: PackageRecord = serde_json::from_value(json!({
            "name": "acme/widget",
            "version": "v1.2.0",
            "version_normalized": "1.2.0.0",
            "dist": { "type": "zip", "reference": "0123456789abcdef" },
            "source": { "type": "git", "reference": "fedcba9876543210" },
            "provide": [],
            "replace": { "acme/legacy-widget": "self.version" }
        }))
        .unwrap();

        let package = record.to_package();

        assert_eq!(package.name, "acme/widget");
        assert_eq!(package.pretty_version, "v1.2.0");
        assert_eq!(package.version, Version::parse("1.2.0").unwrap());
        assert_eq!(package.reference.as_deref(), Some("0123456789abcdef"));
        assert!(package.provides.is_empty());
        assert_eq!(
            package.replaces,
            vec![Link::new(
                "acme/legacy-widget",
                Some(Version::parse("1.2.0").unwrap())
            )]
        );
    }

    #[test]
    fn link_lists_are_ignored() {
        let record: PackageRecord = serde_json::from_value(json!({
            "name": "acme/widget",
            "version": "1.0.0",
            "provide": ["acme/widget-implementation"]
        }))
        .unwrap();

        assert!(record.provide.is_empty());
    }

    #[test]
    fn to_package_falls_back_to_source_reference() {
        let record: PackageRecord = serde_json::from_value(json!({
            "name": "acme/edge",
            "version": "dev-main",
            "dist": null,
            "source": { "reference": "abcdef1234567890" }
        }))
        .unwrap();

        let package = record.to_package();

        assert!(package.is_dev());
        assert_eq!(package.reference.as_deref(), Some("abcdef1234567890"));
    }

    #[test]
    fn to_package_keeps_ranges_as_unversioned_links() {
        let mut record = PackageRecord::new("acme/impl", "1.0.0");
        record
            .provide
            .insert("psr/log-implementation".to_string(), "^1.0 || ^2.0".to_string());

        let package = record.to_package();

        assert_eq!(
            package.provides,
            vec![Link::new("psr/log-implementation", None)]
        );
    }

    #[test]
    fn package_record_serializes_without_empty_fields() {
        let record = PackageRecord::new("acme/widget", "1.0.0").with_dist_reference("abc");

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "name": "acme/widget",
                "version": "1.0.0",
                "dist": { "reference": "abc" }
            })
        );
    }
}
