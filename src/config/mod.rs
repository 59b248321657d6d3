// src/config/mod.rs

//! Engine configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into typed settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    EngineConfig, GroupDefaults, GroupSection, LoggingSection, ProxyDefaults, ProxySection,
    RawEngineConfig,
};
pub use validate::parse_duration;
