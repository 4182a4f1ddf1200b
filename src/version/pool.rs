//! Package pools: aggregated, stability-filtered views over package sources

use std::sync::Arc;

use tracing::debug;

use crate::version::constraint::VersionConstraint;
use crate::version::package::Package;
use crate::version::source::PackageSource;
use crate::version::stability::StabilityFilter;

/// Composite package source
///
/// Fans every query out to its members in insertion order, concatenates
/// the answers and drops packages whose stability is not visible.
/// Installed sources and platform packages bypass the stability filter.
pub struct Pool {
    sources: Vec<(Arc<dyn PackageSource>, bool)>,
    stability: StabilityFilter,
}

impl Pool {
    pub fn new(stability: StabilityFilter) -> Self {
        Self {
            sources: Vec::new(),
            stability,
        }
    }

    pub fn add_source(&mut self, source: Arc<dyn PackageSource>) {
        self.sources.push((source, true));
    }

    /// Add installed packages, which stay visible whatever their stability
    pub fn add_installed_source(&mut self, source: Arc<dyn PackageSource>) {
        self.sources.push((source, false));
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Packages named `name` satisfying `constraint`, in no particular order
    pub fn what_provides(
        &self,
        name: &str,
        constraint: Option<&VersionConstraint>,
        must_match_name: bool,
    ) -> Vec<Package> {
        self.query(name, constraint, must_match_name)
    }
}

impl PackageSource for Pool {
    fn query(
        &self,
        name: &str,
        constraint: Option<&VersionConstraint>,
        exact_name: bool,
    ) -> Vec<Package> {
        let packages: Vec<Package> = self
            .sources
            .iter()
            .flat_map(|(source, filtered)| {
                source
                    .query(name, constraint, exact_name)
                    .into_iter()
                    .filter(move |package| {
                        !filtered
                            || package.is_platform()
                            || self.stability.is_visible(&package.name, package.stability())
                    })
            })
            .collect();

        debug!(
            "Pool query {} {} matched {} packages",
            name,
            constraint.map_or("*", |c| c.pretty()),
            packages.len()
        );

        packages
    }
}

/// Repositories a check can draw packages from
#[derive(Clone, Default)]
pub struct PoolSources {
    /// Synthetic platform packages, joined to both pools when present
    pub platform: Option<Arc<dyn PackageSource>>,
    /// Installed packages, if anything is installed
    pub local: Option<Arc<dyn PackageSource>>,
    /// Every configured remote repository
    pub remotes: Vec<Arc<dyn PackageSource>>,
}

/// Pool over every known package regardless of installation state
pub fn build_global_pool(sources: &PoolSources, stability: StabilityFilter) -> Pool {
    let mut pool = Pool::new(stability);
    if let Some(platform) = &sources.platform {
        pool.add_source(Arc::clone(platform));
    }
    for remote in &sources.remotes {
        pool.add_source(Arc::clone(remote));
    }
    pool
}

/// Pool over installed packages
///
/// Without a local repository nothing is installed yet, so every known
/// package is a candidate for "current".
pub fn build_local_pool(sources: &PoolSources, stability: StabilityFilter) -> Pool {
    let mut pool = Pool::new(stability);
    if let Some(platform) = &sources.platform {
        pool.add_source(Arc::clone(platform));
    }
    match &sources.local {
        Some(local) => pool.add_installed_source(Arc::clone(local)),
        None => {
            for remote in &sources.remotes {
                pool.add_source(Arc::clone(remote));
            }
        }
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::version::source::ArrayRepository;
    use crate::version::stability::Stability;

    fn versions(packages: &[Package]) -> Vec<&str> {
        packages.iter().map(|p| p.pretty_version.as_str()).collect()
    }

    fn repo(packages: &[(&str, &str)]) -> Arc<dyn PackageSource> {
        Arc::new(ArrayRepository::new(
            packages
                .iter()
                .map(|(name, version)| Package::new(name, version))
                .collect(),
        ))
    }

    fn sources(local: bool) -> PoolSources {
        PoolSources {
            platform: Some(repo(&[("php", "8.3.0")])),
            local: local.then(|| repo(&[("acme/widget", "1.2.0")])),
            remotes: vec![
                repo(&[("acme/widget", "1.2.0"), ("acme/widget", "1.5.0")]),
                repo(&[("acme/widget", "3.0.0"), ("acme/widget", "3.1.0-beta1")]),
            ],
        }
    }

    #[test]
    fn pool_concatenates_sources_in_order() {
        let pool = build_global_pool(&sources(true), StabilityFilter::default());

        let result = pool.what_provides("acme/widget", None, true);

        assert_eq!(versions(&result), vec!["1.2.0", "1.5.0", "3.0.0"]);
    }

    #[test]
    fn pool_honors_stability_flags() {
        let stability = StabilityFilter::new(
            Stability::Stable,
            HashMap::from([("acme/widget".to_string(), Stability::Beta)]),
        );
        let pool = build_global_pool(&sources(true), stability);

        let result = pool.what_provides("acme/widget", None, true);

        assert_eq!(versions(&result), vec!["1.2.0", "1.5.0", "3.0.0", "3.1.0-beta1"]);
    }

    #[test]
    fn local_pool_uses_only_installed_packages_when_available() {
        let pool = build_local_pool(&sources(true), StabilityFilter::default());

        assert_eq!(pool.source_count(), 2);
        assert_eq!(versions(&pool.what_provides("acme/widget", None, true)), vec!["1.2.0"]);
    }

    #[test]
    fn local_pool_keeps_installed_packages_below_minimum_stability() {
        let sources = PoolSources {
            local: Some(repo(&[("acme/widget", "2.0.0-beta1")])),
            ..sources(true)
        };
        let local = build_local_pool(&sources, StabilityFilter::default());
        let global = build_global_pool(&sources, StabilityFilter::default());

        assert_eq!(
            versions(&local.what_provides("acme/widget", None, true)),
            vec!["2.0.0-beta1"]
        );
        assert_eq!(
            versions(&global.what_provides("acme/widget", None, true)),
            vec!["1.2.0", "1.5.0", "3.0.0"]
        );
    }

    #[test]
    fn local_pool_falls_back_to_remotes_without_local_repository() {
        let pool = build_local_pool(&sources(false), StabilityFilter::default());

        assert_eq!(pool.source_count(), 3);
        assert_eq!(
            versions(&pool.what_provides("acme/widget", None, true)),
            vec!["1.2.0", "1.5.0", "3.0.0"]
        );
    }

    #[test]
    fn pools_expose_platform_packages() {
        let sources = sources(true);
        let local = build_local_pool(&sources, StabilityFilter::default());
        let global = build_global_pool(&sources, StabilityFilter::default());

        assert_eq!(versions(&local.what_provides("php", None, true)), vec!["8.3.0"]);
        assert_eq!(versions(&global.what_provides("php", None, true)), vec!["8.3.0"]);
    }

    #[test]
    fn pools_without_platform_source_do_not_know_platform_packages() {
        let sources = PoolSources {
            platform: None,
            ..sources(true)
        };
        let global = build_global_pool(&sources, StabilityFilter::default());

        assert!(global.what_provides("php", None, true).is_empty());
    }
}
