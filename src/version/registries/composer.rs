//! Composer repository (metadata API v2) implementation

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{DEFAULT_PACKAGIST_URL, FETCH_TIMEOUT_MS};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::PackageRecord;

/// Marker of the minified metadata format
const MINIFIED_FORMAT: &str = "composer/2.0";

/// Value removing an inherited key in minified metadata
const UNSET_MARKER: &str = "__unset";

/// Response from `/p2/{name}.json`
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    packages: Map<String, Value>,
    #[serde(default)]
    minified: Option<String>,
}

/// Registry implementation for Composer repositories such as Packagist
pub struct ComposerRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl ComposerRegistry {
    /// Creates a new ComposerRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("composer-updates/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one metadata file; `Ok(None)` when the repository does not have it
    async fn fetch_file(
        &self,
        package_name: &str,
        file: &str,
    ) -> Result<Option<Vec<PackageRecord>>, RegistryError> {
        let url = format!("{}/p2/{}.json", self.base_url, file);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("Composer repository returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let metadata: MetadataResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Composer metadata response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(Some(metadata.into_records(package_name)))
    }
}

impl Default for ComposerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PACKAGIST_URL)
    }
}

impl MetadataResponse {
    fn into_records(mut self, package_name: &str) -> Vec<PackageRecord> {
        let entries = match self
            .packages
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(package_name))
        {
            Some((_, Value::Array(entries))) => std::mem::take(entries),
            _ => return Vec::new(),
        };

        let entries = if self.minified.as_deref() == Some(MINIFIED_FORMAT) {
            expand_minified(entries)
        } else {
            entries
        };

        entries
            .into_iter()
            .filter_map(|mut entry| {
                if let Value::Object(object) = &mut entry {
                    object
                        .entry("name")
                        .or_insert_with(|| Value::String(package_name.to_string()));
                }
                serde_json::from_value::<PackageRecord>(entry)
                    .inspect_err(|e| debug!("Skipping malformed {} entry: {}", package_name, e))
                    .ok()
            })
            .collect()
    }
}

/// Expand `composer/2.0` minified metadata
///
/// Every entry only lists the keys that differ from the previous expanded
/// entry; a value of `"__unset"` drops the key.
fn expand_minified(entries: Vec<Value>) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(entries.len());
    let mut previous: Option<Map<String, Value>> = None;

    for entry in entries {
        let Value::Object(diff) = entry else {
            continue;
        };

        let mut current = previous.take().unwrap_or_default();
        for (key, value) in diff {
            if value.as_str() == Some(UNSET_MARKER) {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }

        expanded.push(Value::Object(current.clone()));
        previous = Some(current);
    }

    expanded
}

#[async_trait::async_trait]
impl Registry for ComposerRegistry {
    fn url(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch_package(
        &self,
        package_name: &str,
    ) -> Result<Vec<PackageRecord>, RegistryError> {
        let name = package_name.to_ascii_lowercase();

        let mut records = self
            .fetch_file(package_name, &name)
            .await?
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))?;

        match self.fetch_file(package_name, &format!("{}~dev", name)).await {
            Ok(Some(branches)) => records.extend(branches),
            Ok(None) => {}
            Err(e) => warn!("Failed to fetch branches of {}: {}", package_name, e),
        }

        debug!(
            "Fetched {} versions of {} from {}",
            records.len(),
            package_name,
            self.base_url
        );

        Ok(records)
    }
}
