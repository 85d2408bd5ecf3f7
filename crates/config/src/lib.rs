//! Configuration loading, validation, and env substitution.
//!
//! Config files: `tally.toml`, `tally.yaml`, or `tally.json`,
//! searched in `./` then `~/.config/tally/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values and `TALLY_*`
//! environment overrides for secrets.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        AuthConfig, ClassifierConfig, ContinuationConfig, LedgerBackend, LedgerConfig, NluConfig,
        RouterConfig, TallyConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_toml_str},
};
