//! Registry implementations for fetching package metadata

pub mod composer;

pub use composer::ComposerRegistry;
