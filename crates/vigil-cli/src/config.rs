//! Config loading – reads/writes `~/.vigil/config.toml`.

use std::fs;
use std::path::PathBuf;

use vigil_agent::AgentConfig;

/// Return the path to `~/.vigil/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Return the directory holding the persisted geofence/pattern documents.
pub fn data_dir() -> PathBuf {
    config_path()
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".vigil").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<AgentConfig>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &PathBuf) -> Result<Option<AgentConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: AgentConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `VIGIL_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `VIGIL_RNG_SEED` | `rng_seed` |
/// | `VIGIL_CLUTCH_HEIGHT` | `clutch_height` |
pub fn apply_env_overrides(cfg: &mut AgentConfig) {
    if let Ok(v) = std::env::var("VIGIL_RNG_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.rng_seed = Some(seed);
    }
    if let Ok(v) = std::env::var("VIGIL_CLUTCH_HEIGHT")
        && let Ok(height) = v.parse::<f64>()
    {
        cfg.clutch_height = height;
    }
}

/// Save the config to disk, creating `~/.vigil/` if necessary.
pub fn save(cfg: &AgentConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &AgentConfig, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = AgentConfig::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert!(loaded.enable_combat);
        assert_eq!(loaded.hunger_threshold, 16);
        assert_eq!(loaded.clutch_height, 10.0);
    }

    #[test]
    fn config_path_points_to_vigil_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".vigil"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn apply_env_overrides_sets_rng_seed() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("VIGIL_RNG_SEED", "12345") };
        let mut cfg = AgentConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.rng_seed, Some(12345));
        unsafe { std::env::remove_var("VIGIL_RNG_SEED") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_seed() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("VIGIL_RNG_SEED", "not-a-number") };
        let mut cfg = AgentConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.rng_seed, None);
        unsafe { std::env::remove_var("VIGIL_RNG_SEED") };
    }

    #[test]
    fn apply_env_overrides_sets_clutch_height() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("VIGIL_CLUTCH_HEIGHT", "6.5") };
        let mut cfg = AgentConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.clutch_height, 6.5);
        unsafe { std::env::remove_var("VIGIL_CLUTCH_HEIGHT") };
    }
}
