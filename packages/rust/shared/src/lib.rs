//! Shared error model and configuration for Nexus.
//!
//! This crate is the foundation depended on by all other Nexus crates.
//! It provides:
//! - [`NexusError`]: the unified error type
//! - Configuration ([`AppConfig`], the per-component runtime configs, config loading)

pub mod config;
pub mod error;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BookmarksConfig, BookmarksSection, DispatchConfig, DispatchSection, ExtractConfig,
    ExtractionSection, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_config,
};
pub use error::{NexusError, Result};
