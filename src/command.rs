//! Command entry points
//!
//! `check_updates` assembles everything a check needs from disk and the
//! network; `run_check` is the same pipeline over injected collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::{data_dir, db_path};
use crate::parser::composer_json::RootManifest;
use crate::parser::installed_json::load_installed_repository;
use crate::report::render::{ReportFormat, render};
use crate::report::sink::{ConsoleSink, OutputSink};
use crate::version::cache::{Cache, MetadataStorer};
use crate::version::checker::{CheckOutcome, check_requirements};
use crate::version::loader::{LoadOptions, load_remote_repository};
use crate::version::pool::{PoolSources, build_global_pool, build_local_pool};
use crate::version::registries::ComposerRegistry;
use crate::version::registry::Registry;
use crate::version::source::{ArrayRepository, PackageSource, PlatformRepository};

pub const MANIFEST_FILE_NAME: &str = "composer.json";

/// Options of the `check-updates` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Directory holding composer.json
    pub working_dir: PathBuf,
    pub format: ReportFormat,
    /// Also check `require-dev`
    pub include_dev: bool,
    /// Use cached metadata only
    pub offline: bool,
    /// Leave the platform repository out of both pools
    pub no_platform: bool,
    pub verbose: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            format: ReportFormat::Table,
            include_dev: false,
            offline: false,
            no_platform: false,
            verbose: false,
        }
    }
}

/// Collaborators a check runs against
pub struct CheckContext {
    pub manifest: RootManifest,
    /// Installed packages, `None` when nothing is installed
    pub local: Option<ArrayRepository>,
    /// Platform packages, `None` when the platform is excluded
    pub platform: Option<PlatformRepository>,
    pub registries: Vec<Arc<dyn Registry>>,
    pub storer: Arc<dyn MetadataStorer>,
}

/// Run `check-updates` for the project in `options.working_dir`
pub async fn check_updates(options: &CheckOptions) -> anyhow::Result<Vec<CheckOutcome>> {
    let context = load_context(options).await?;
    let mut sink = ConsoleSink::stdout(options.verbose);
    run_check(&context, options, &mut sink).await
}

/// Read the project files and set up repositories and cache
pub async fn load_context(options: &CheckOptions) -> anyhow::Result<CheckContext> {
    let manifest_path = options.working_dir.join(MANIFEST_FILE_NAME);
    let manifest = RootManifest::load(&manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;

    let vendor_dir = options.working_dir.join(&manifest.vendor_dir);
    let local = load_installed_repository(&vendor_dir)
        .with_context(|| format!("Failed to load installed packages from {}", vendor_dir.display()))?;

    let platform = load_platform(&manifest, options).await?;
    let registries = build_registries(&manifest);
    let storer = open_cache()?;

    Ok(CheckContext {
        manifest,
        local,
        platform,
        registries,
        storer,
    })
}

async fn load_platform(
    manifest: &RootManifest,
    options: &CheckOptions,
) -> anyhow::Result<Option<PlatformRepository>> {
    if options.no_platform || !manifest.config.policy.include_platform {
        info!("Platform repository disabled");
        return Ok(None);
    }

    let platform_config = &manifest.config.platform;
    let detected = if platform_config.probe {
        let php_binary = platform_config.php_binary.clone();
        tokio::task::spawn_blocking(move || PlatformRepository::detect(&php_binary))
            .await
            .context("Platform detection task failed")?
    } else {
        Vec::new()
    };

    Ok(Some(PlatformRepository::new(
        detected,
        &manifest.platform_overrides,
    )))
}

/// Registries declared by the manifest, the default repository last
pub fn build_registries(manifest: &RootManifest) -> Vec<Arc<dyn Registry>> {
    let mut registries: Vec<Arc<dyn Registry>> = manifest
        .repositories
        .iter()
        .map(|url| Arc::new(ComposerRegistry::new(url)) as Arc<dyn Registry>)
        .collect();

    let packagist = &manifest.config.repositories.packagist;
    if manifest.packagist_enabled && packagist.enabled {
        registries.push(Arc::new(ComposerRegistry::new(&packagist.url)));
    }

    registries
}

/// Open the on-disk cache, falling back to a throwaway in-memory one
fn open_cache() -> anyhow::Result<Arc<dyn MetadataStorer>> {
    let path = db_path();
    let cache = match open_disk_cache(&path) {
        Ok(cache) => cache,
        Err(e) => {
            warn!(
                "Failed to open cache at {}: {:#}. Using in-memory cache.",
                path.display(),
                e
            );
            Cache::in_memory().context("Failed to open in-memory cache")?
        }
    };
    Ok(Arc::new(cache))
}

fn open_disk_cache(path: &Path) -> anyhow::Result<Cache> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(Cache::new(path)?)
}

/// Load remote metadata, build the pools, check every requirement and render the result
pub async fn run_check(
    context: &CheckContext,
    options: &CheckOptions,
    sink: &mut dyn OutputSink,
) -> anyhow::Result<Vec<CheckOutcome>> {
    let manifest = &context.manifest;
    let requirements = manifest.requirements(options.include_dev);
    let names: Vec<String> = requirements.iter().map(|r| r.target.clone()).collect();

    let load_options = LoadOptions {
        refresh_interval: manifest.config.cache.refresh_interval,
        offline: options.offline,
        ..LoadOptions::default()
    };

    let mut remotes: Vec<Arc<dyn PackageSource>> = Vec::with_capacity(context.registries.len());
    for registry in &context.registries {
        let repository = load_remote_repository(
            context.storer.as_ref(),
            registry.as_ref(),
            &names,
            &load_options,
        )
        .await;
        remotes.push(Arc::new(repository));
    }

    let sources = PoolSources {
        platform: context
            .platform
            .clone()
            .map(|platform| Arc::new(platform) as Arc<dyn PackageSource>),
        local: context
            .local
            .clone()
            .map(|local| Arc::new(local) as Arc<dyn PackageSource>),
        remotes,
    };

    let stability = manifest.stability_filter();
    let local_pool = build_local_pool(&sources, stability.clone());
    let global_pool = build_global_pool(&sources, stability);

    let outcomes = check_requirements(&local_pool, &global_pool, &requirements);

    render(&outcomes, options.format, &manifest.config.policy, sink)
        .context("Failed to write report")?;

    Ok(outcomes)
}

/// Remove all cached repository metadata
pub fn clear_cache() -> anyhow::Result<usize> {
    let path = db_path();
    if !path.exists() {
        info!("No cache at {}", path.display());
        return Ok(0);
    }

    let cache = Cache::new(&path)
        .with_context(|| format!("Failed to open cache at {}", path.display()))?;
    let removed = cache.clear().context("Failed to clear cache")?;
    info!("Cleared cache in {}", data_dir().display());

    Ok(removed)
}
