//! Parser layer
//! - types.rs: Requirement
//! - error.rs: ManifestError
//! - composer_json.rs: root manifest (composer.json)
//! - installed_json.rs: installed packages (vendor/composer/installed.json)

pub mod composer_json;
pub mod error;
pub mod installed_json;
pub mod types;

pub use composer_json::RootManifest;
pub use error::ManifestError;
pub use installed_json::{load_installed_repository, parse_installed};
pub use types::Requirement;
