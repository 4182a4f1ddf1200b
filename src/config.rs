use serde::Deserialize;
use std::path::PathBuf;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default metadata refresh interval in milliseconds (24 hours)
pub const DEFAULT_REFRESH_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

// =============================================================================
// Defaults
// =============================================================================

/// Default Composer repository
pub const DEFAULT_PACKAGIST_URL: &str = "https://repo.packagist.org";

/// PHP binary probed for platform packages
pub const DEFAULT_PHP_BINARY: &str = "php";

/// Key under `extra` in composer.json holding this tool's configuration
pub const EXTRA_CONFIG_KEY: &str = "check-updates";

const APP_DIR_NAME: &str = "composer-updates";

/// File names inside the data directory
pub const DB_FILE_NAME: &str = "metadata.db";
pub const LOG_FILE_NAME: &str = "composer-updates.log";

/// Check configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckConfig {
    pub cache: CacheConfig,
    pub repositories: RepositoriesConfig,
    pub platform: PlatformConfig,
    pub policy: PolicyConfig,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Metadata refresh interval in milliseconds
    pub refresh_interval: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

/// Repository-specific configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RepositoriesConfig {
    pub packagist: RegistryConfig,
}

/// Individual repository configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_PACKAGIST_URL.to_string(),
        }
    }
}

/// Platform package detection
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformConfig {
    /// Ask the PHP binary for its version and extensions
    pub probe: bool,
    pub php_binary: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            probe: true,
            php_binary: DEFAULT_PHP_BINARY.to_string(),
        }
    }
}

/// When requirements that need no action are reported
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpToDatePolicy {
    /// Only in verbose mode
    #[default]
    Verbose,
    Always,
}

/// Reporting policy switches
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Add the platform repository to both pools
    pub include_platform: bool,
    pub up_to_date: UpToDatePolicy,
    /// Report installed versions that rank above the repositories' best match
    pub report_anomalies: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            include_platform: true,
            up_to_date: UpToDatePolicy::Verbose,
            report_anomalies: true,
        }
    }
}

/// Returns the path to the data directory for composer-updates.
/// Uses $XDG_DATA_HOME/composer-updates if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/composer-updates,
/// or ./composer-updates if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the metadata cache database.
pub fn db_path() -> PathBuf {
    data_dir().join(DB_FILE_NAME)
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn check_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<CheckConfig>(json!({
            "cache": {
                "refreshInterval": 1000
            }
        }))
        .unwrap();

        assert_eq!(result.cache.refresh_interval, 1000);
        assert_eq!(result.repositories, RepositoriesConfig::default());
        assert_eq!(result.policy, PolicyConfig::default());
    }

    #[test]
    fn check_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<CheckConfig>(json!({
            "cache": {
                "refreshInterval": 5000
            },
            "repositories": {
                "packagist": { "enabled": false, "url": "https://mirror.example" }
            },
            "platform": {
                "probe": false,
                "phpBinary": "/usr/bin/php8.3"
            },
            "policy": {
                "includePlatform": false,
                "upToDate": "always",
                "reportAnomalies": false
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            CheckConfig {
                cache: CacheConfig {
                    refresh_interval: 5000
                },
                repositories: RepositoriesConfig {
                    packagist: RegistryConfig {
                        enabled: false,
                        url: "https://mirror.example".to_string(),
                    },
                },
                platform: PlatformConfig {
                    probe: false,
                    php_binary: "/usr/bin/php8.3".to_string(),
                },
                policy: PolicyConfig {
                    include_platform: false,
                    up_to_date: UpToDatePolicy::Always,
                    report_anomalies: false,
                },
            }
        );
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/composer-updates"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(
            path,
            PathBuf::from("/home/user/.local/share/composer-updates")
        );
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./composer-updates"));
    }
}
