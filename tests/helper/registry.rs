//! Registry test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use composer_updates::version::cache::Cache;
use composer_updates::version::error::RegistryError;
use composer_updates::version::registry::Registry;
use composer_updates::version::types::PackageRecord;

pub const MOCK_REPOSITORY_URL: &str = "https://repo.example.com";

/// Mock registry for testing
pub struct MockRegistry {
    url: String,
    packages: HashMap<String, Vec<PackageRecord>>,
    failing: bool,
    fetches: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            url: MOCK_REPOSITORY_URL.to_string(),
            packages: HashMap::new(),
            failing: false,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_versions(self, package: &str, versions: Vec<&str>) -> Self {
        let records = versions
            .into_iter()
            .map(|version| PackageRecord::new(package, version))
            .collect();
        self.with_records(package, records)
    }

    pub fn with_records(mut self, package: &str, records: Vec<PackageRecord>) -> Self {
        self.packages.insert(package.to_string(), records);
        self
    }

    /// Every fetch fails with a server error
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MockRegistry {
    fn url(&self) -> String {
        self.url.clone()
    }

    async fn fetch_package(
        &self,
        package_name: &str,
    ) -> Result<Vec<PackageRecord>, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.failing {
            return Err(RegistryError::InvalidResponse(
                "Unexpected status: 500".to_string(),
            ));
        }

        match self.packages.get(package_name) {
            Some(records) => Ok(records.clone()),
            None => Err(RegistryError::NotFound(package_name.to_string())),
        }
    }
}

/// Create a test cache backed by a temporary database
pub fn create_test_cache() -> (TempDir, Arc<Cache>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let cache = Arc::new(Cache::new(&db_path).unwrap());
    (temp_dir, cache)
}
