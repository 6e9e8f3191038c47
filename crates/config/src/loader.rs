use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::CourierConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "courier.toml",
    "courier.yaml",
    "courier.yml",
    "courier.json",
];

/// Prefix of the nested environment overrides (`TELEGRAM__API_ID`, ...).
const TELEGRAM_ENV_PREFIX: &str = "TELEGRAM__";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<CourierConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load `path` if given, otherwise discover a config file, then apply
/// `TELEGRAM__*` environment overrides.
///
/// An explicit path that cannot be read is an error; a discovered file
/// that fails to parse falls back to defaults with a warning.
pub fn load(path: Option<&Path>) -> Result<CourierConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./courier.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/courier/courier.{toml,yaml,yml,json}` (user-global)
///
/// Returns `CourierConfig::default()` if no config file is found.
pub fn discover_and_load() -> CourierConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    CourierConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/courier/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "courier").map(|d| d.config_dir().to_path_buf())
}

/// Apply `TELEGRAM__*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut CourierConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply overrides using a custom lookup, so tests need not touch the
/// process environment.
pub fn apply_env_overrides_with(
    config: &mut CourierConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let var = |field: &str| {
        let name = format!("{TELEGRAM_ENV_PREFIX}{field}");
        lookup(&name).map(|value| (name, value))
    };
    let tg = &mut config.telegram;

    if let Some((name, value)) = var("API_ID") {
        tg.api_id = value.trim().parse().map_err(|e| Error::InvalidEnv {
            name,
            message: format!("{e}"),
        })?;
    }
    if let Some((_, value)) = var("API_HASH") {
        tg.api_hash = Secret::new(value);
    }
    if let Some((_, value)) = var("PHONE") {
        tg.phone = value;
    }
    if let Some((_, value)) = var("BOT_TOKEN") {
        tg.bot_token = Secret::new(value);
    }
    if let Some((_, value)) = var("CHANNELS") {
        tg.channels = value;
    }
    if let Some((name, value)) = var("TARGET_CHANNEL_ID") {
        tg.target_channel_id = value.trim().parse().map_err(|e| Error::InvalidEnv {
            name,
            message: format!("{e}"),
        })?;
    }
    if let Some((name, value)) = var("AUTH_MODE") {
        tg.auth_mode = value
            .parse()
            .map_err(|message| Error::InvalidEnv { name, message })?;
    }
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> Result<CourierConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}
