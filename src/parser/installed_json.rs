//! vendor/composer/installed.json parser

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::parser::error::ManifestError;
use crate::version::source::ArrayRepository;
use crate::version::types::PackageRecord;

/// `installed.json` in the two layouts Composer has written over time
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstalledFile {
    Versioned { packages: Vec<PackageRecord> },
    Legacy(Vec<PackageRecord>),
}

/// Parse the contents of an `installed.json` file
pub fn parse_installed(content: &str) -> Result<Vec<PackageRecord>, ManifestError> {
    Ok(match serde_json::from_str(content)? {
        InstalledFile::Versioned { packages } => packages,
        InstalledFile::Legacy(packages) => packages,
    })
}

/// Load installed packages below `vendor_dir`
///
/// Returns `None` when nothing has been installed yet.
pub fn load_installed_repository(
    vendor_dir: &Path,
) -> Result<Option<ArrayRepository>, ManifestError> {
    let path = vendor_dir.join("composer").join("installed.json");
    if !path.exists() {
        debug!("No installed packages at {}", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    let records = parse_installed(&content)?;
    info!("Loaded {} installed packages", records.len());

    Ok(Some(ArrayRepository::from_records(&records)))
}
