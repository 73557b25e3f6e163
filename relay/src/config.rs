//! Locating the configuration file

use std::path::{Path, PathBuf};

/// Locations searched, in order, when no path was given explicitly
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["./relay.config.ron", "/etc/relay/relay.config.ron"];

/// Find the configuration file using the following precedence:
/// 1. `explicit` (the `--config` flag)
/// 2. `from_env` (the `RELAY_CONFIG` environment variable)
/// 3. [`DEFAULT_CONFIG_PATHS`]
///
/// Returns `None` when nothing was given and no default file exists.
///
/// # Errors
/// If an explicitly given path does not exist
pub fn find_config_file(
    explicit: Option<PathBuf>,
    from_env: Option<PathBuf>,
) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!("Config file does not exist: {}", path.display());
    }

    if let Some(path) = from_env {
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!(
            "RELAY_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    Ok(DEFAULT_CONFIG_PATHS
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf))
}
