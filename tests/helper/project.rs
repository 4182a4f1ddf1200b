//! Project fixture utilities

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use composer_updates::command::{CheckContext, CheckOptions, run_check};
use composer_updates::parser::{RootManifest, load_installed_repository};
use composer_updates::report::ConsoleSink;
use composer_updates::version::cache::MetadataStorer;
use composer_updates::version::checker::CheckOutcome;
use composer_updates::version::registry::Registry;
use composer_updates::version::source::PlatformRepository;

/// A project directory with composer.json and optionally installed packages
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new(manifest: Value) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("composer.json"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();
        Self { dir }
    }

    /// Write `vendor/composer/installed.json`
    pub fn with_installed(self, installed: Value) -> Self {
        let composer_dir = self.dir.path().join("vendor").join("composer");
        std::fs::create_dir_all(&composer_dir).unwrap();
        std::fs::write(
            composer_dir.join("installed.json"),
            serde_json::to_string_pretty(&installed).unwrap(),
        )
        .unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Load the project the way `check-updates` does, without probing PHP
    pub fn context(
        &self,
        registries: Vec<Arc<dyn Registry>>,
        storer: Arc<dyn MetadataStorer>,
    ) -> CheckContext {
        let manifest = RootManifest::load(&self.path().join("composer.json")).unwrap();
        let local = load_installed_repository(&self.path().join(&manifest.vendor_dir)).unwrap();
        let platform = manifest
            .config
            .policy
            .include_platform
            .then(|| PlatformRepository::new(vec![], &manifest.platform_overrides));

        CheckContext {
            manifest,
            local,
            platform,
            registries,
            storer,
        }
    }
}

/// Run a check and capture the report
pub async fn run_and_capture(
    context: &CheckContext,
    options: &CheckOptions,
) -> (Vec<CheckOutcome>, String) {
    let mut sink = ConsoleSink::new(Vec::new(), options.verbose);
    let outcomes = run_check(context, options, &mut sink).await.unwrap();
    let output = String::from_utf8(sink.into_inner()).unwrap();
    (outcomes, output)
}

/// A fixed-width report row as the table renderer writes it
pub fn table_row(package: &str, required: &str, current: &str, update: &str, latest: &str) -> String {
    format!(
        "{:<30} | {:<10} | {:<10} | {:<10} | {:<10}",
        package, required, current, update, latest
    )
}
