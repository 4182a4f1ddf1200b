//! Loading remote repository metadata through the cache

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{DEFAULT_REFRESH_INTERVAL_MS, FETCH_STAGGER_DELAY_MS};
use crate::version::cache::{CachedMetadata, MetadataStorer, current_timestamp_ms};
use crate::version::error::RegistryError;
use crate::version::package::is_platform_name;
use crate::version::registry::Registry;
use crate::version::source::ArrayRepository;
use crate::version::types::PackageRecord;

/// How remote metadata is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Cached metadata younger than this (milliseconds) is used without fetching
    pub refresh_interval: i64,
    /// Never contact the repository
    pub offline: bool,
    /// Delay between starting consecutive fetches
    pub stagger_delay_ms: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
            offline: false,
            stagger_delay_ms: FETCH_STAGGER_DELAY_MS,
        }
    }
}

/// Fetch and cache a single package's metadata
///
/// Fresh cache entries are returned as-is. A failed fetch falls back to
/// whatever the cache holds, however old.
async fn load_package<S: MetadataStorer + ?Sized>(
    storer: &S,
    registry: &dyn Registry,
    package_name: &str,
    options: &LoadOptions,
) -> Vec<PackageRecord> {
    let repository = registry.url();

    let cached = storer
        .get_metadata(&repository, package_name)
        .inspect_err(|e| {
            error!(
                "Failed to read cache for {} from {}: {}",
                package_name, repository, e
            )
        })
        .ok()
        .flatten();

    if let Some(cached) = &cached
        && cached.is_fresh(current_timestamp_ms(), options.refresh_interval)
    {
        debug!("Using cached metadata for {} from {}", package_name, repository);
        return cached.records.clone();
    }

    if options.offline {
        debug!("Offline: not fetching {} from {}", package_name, repository);
        return stale_records(cached);
    }

    match registry.fetch_package(package_name).await {
        Ok(records) => {
            info!(
                "Fetched {} versions of {} from {}",
                records.len(),
                package_name,
                repository
            );
            let _ = storer
                .replace_metadata(&repository, package_name, records.clone())
                .inspect_err(|e| {
                    error!(
                        "Failed to save metadata for {} from {}: {}",
                        package_name, repository, e
                    )
                });
            records
        }
        Err(RegistryError::NotFound(_)) => {
            info!("Package not found: {} in {}", package_name, repository);
            let _ = storer
                .mark_not_found(&repository, package_name)
                .inspect_err(|e| {
                    error!(
                        "Failed to mark {} as not found in {}: {}",
                        package_name, repository, e
                    )
                });
            Vec::new()
        }
        Err(e) => {
            error!(
                "Failed to fetch {} from {}: {}",
                package_name, repository, e
            );
            stale_records(cached)
        }
    }
}

fn stale_records(cached: Option<CachedMetadata>) -> Vec<PackageRecord> {
    match cached {
        Some(cached) => {
            warn!("Using stale metadata ({} records)", cached.records.len());
            cached.records
        }
        None => Vec::new(),
    }
}

/// Build an in-memory repository holding every known version of `names`
///
/// Platform packages are skipped and names are deduplicated ignoring case.
/// Fetches run in parallel with staggered start times to avoid rate limiting.
/// Failures are logged and leave the affected package empty.
pub async fn load_remote_repository<S: MetadataStorer + ?Sized>(
    storer: &S,
    registry: &dyn Registry,
    names: &[String],
    options: &LoadOptions,
) -> ArrayRepository {
    let mut seen = HashSet::new();
    let names: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !is_platform_name(name))
        .filter(|name| seen.insert(name.to_ascii_lowercase()))
        .collect();

    info!(
        "Loading metadata for {} packages from {}",
        names.len(),
        registry.url()
    );

    let futures = names.into_iter().enumerate().map(|(i, name)| {
        let delay = Duration::from_millis(options.stagger_delay_ms * i as u64);
        async move {
            sleep(delay).await;
            load_package(storer, registry, name, options).await
        }
    });

    let records: Vec<PackageRecord> = join_all(futures).await.into_iter().flatten().collect();

    ArrayRepository::from_records(&records)
}
