use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::debug,
};

use crate::{env_subst::substitute_env, schema::DrivelinkConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "drivelink.toml",
    "drivelink.yaml",
    "drivelink.yml",
    "drivelink.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<DrivelinkConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load the config at `path`, or defaults when there is none.
///
/// Pair with [`find_config_file`] to search the standard locations:
/// 1. `./drivelink.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/drivelink/drivelink.{toml,yaml,yml,json}` (user-global)
///
/// A file that exists but cannot be read or parsed is an error, never
/// replaced by defaults.
pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<DrivelinkConfig> {
    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok(DrivelinkConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    load_config(path)
}

/// Returns the user-global config directory (`~/.config/drivelink/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "drivelink").map(|d| d.config_dir().to_path_buf())
}

/// First existing config file in the search order, if any.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<DrivelinkConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
