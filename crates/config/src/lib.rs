//! Configuration loading, env substitution and validation.
//!
//! Config files: `courier.toml`, `courier.yaml`, or `courier.json`
//! Searched in `./` then `~/.config/courier/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values and
//! `TELEGRAM__<FIELD>` environment overrides.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, apply_env_overrides_with, config_dir, discover_and_load, load,
        load_config,
    },
    schema::{AuthMode, CourierConfig, ServerConfig, TelegramConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
