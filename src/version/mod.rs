//! Version management layer for Composer update checks
//!
//! This module provides the core functionality for fetching and caching
//! repository metadata, assembling package pools, and comparing the installed,
//! constrained-best and latest versions of every declared requirement.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│   Loader    │◀───▶│    Cache    │
//! │  (fetch)    │     │ (metadata)  │     │  (storage)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Sources   │────▶│    Pools    │────▶│   Checker   │
//! │(array,platf)│     │(local,glob.)│     │ (classify)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`ordering`]: Version normalisation and total ordering
//! - [`stability`]: Stability levels and the minimum-stability filter
//! - [`constraint`]: Version constraint parsing and matching
//! - [`package`]: Packages and provide/replace links
//! - [`source`]: Package sources (in-memory, platform)
//! - [`pool`]: Composite, stability-filtered sources
//! - [`checker`]: Version lookup and classification
//! - [`registry`]: Registry trait for fetching metadata from remote repositories
//! - [`registries`]: Concrete registry implementations
//! - [`cache`]: SQLite-based metadata cache
//! - [`loader`]: Cache-aware loading of remote metadata
//! - [`error`]: Error types for versions, constraints, cache and registry operations
//! - [`types`]: Serialized package metadata

pub mod cache;
pub mod checker;
pub mod constraint;
pub mod error;
pub mod loader;
pub mod ordering;
pub mod package;
pub mod pool;
pub mod registries;
pub mod registry;
pub mod source;
pub mod stability;
pub mod types;
