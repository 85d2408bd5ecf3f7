use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::TallyConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["tally.toml", "tally.yaml", "tally.yml", "tally.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<TallyConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./tally.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/tally/tally.{toml,yaml,yml,json}` (user-global)
///
/// Returns `TallyConfig::default()` if no config file is found. Environment
/// overrides are applied in every case.
pub fn discover_and_load() -> TallyConfig {
    let mut config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                TallyConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        TallyConfig::default()
    };
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/tally/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tally").map(|d| d.config_dir().to_path_buf())
}

/// Apply `TALLY_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut TallyConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut TallyConfig, lookup: impl Fn(&str) -> Option<String>) {
    // Comma-separated list so several keys can rotate.
    if let Some(keys) = lookup("TALLY_NLU_API_KEYS") {
        let parsed: Vec<Secret<String>> = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| Secret::new(k.to_string()))
            .collect();
        if !parsed.is_empty() {
            config.nlu.api_keys = parsed;
        }
    }
    if let Some(model) = lookup("TALLY_NLU_MODEL").filter(|m| !m.trim().is_empty()) {
        config.nlu.model = model;
    }
    if let Some(enabled) = lookup("TALLY_NLU_ENABLED") {
        match enabled.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => config.nlu.enabled = true,
            "0" | "false" | "no" | "off" => config.nlu.enabled = false,
            other => warn!(value = other, "ignoring unparseable TALLY_NLU_ENABLED"),
        }
    }
    if let Some(url) = lookup("TALLY_DATABASE_URL").filter(|u| !u.trim().is_empty()) {
        config.ledger.database_url = url;
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<TallyConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
