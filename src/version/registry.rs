//! Registry trait for fetching package metadata from Composer repositories

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::PackageRecord;

/// Trait for fetching package metadata from a repository
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Base URL identifying the repository, also used as the cache key
    fn url(&self) -> String;

    /// Fetches every published version of a package, tagged releases and branches
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "monolog/monolog")
    ///
    /// # Returns
    /// * `Ok(Vec<PackageRecord>)` - All versions in repository order
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_package(&self, package_name: &str)
    -> Result<Vec<PackageRecord>, RegistryError>;
}
