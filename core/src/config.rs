//! Economy configuration loading
//!
//! The config normally lives where `confy` puts it for the `spdm` app name
//! (platform config dir, TOML). An explicit file can be loaded and saved with
//! [`load_file`] / [`save_file`]. Every loaded config goes through
//! [`validate`] before it reaches the features.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use spdm_types::EconomyConfig;
use thiserror::Error;

pub const APP_NAME: &str = "spdm";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        source: toml::ser::Error,
    },

    #[error(transparent)]
    Confy(#[from] confy::ConfyError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Load (or create with defaults) the user's config via confy
pub fn load_config() -> Result<EconomyConfig, ConfigError> {
    let config: EconomyConfig = confy::load(APP_NAME, None)?;
    validate(&config)?;
    Ok(config)
}

/// Where [`load_config`] reads from
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(confy::get_configuration_file_path(APP_NAME, None)?)
}

pub fn load_file(path: &Path) -> Result<EconomyConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: EconomyConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

pub fn save_file(path: &Path, config: &EconomyConfig) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::write(path, contents).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Default directory for shop key files
pub fn default_keys_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_NAME).join("keys"))
}

/// Default location of the CLI's wallet file
pub fn default_store_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_NAME).join("wallets.json"))
}

/// Key directory from the config, falling back to [`default_keys_dir`]
pub fn keys_dir(config: &EconomyConfig) -> Option<PathBuf> {
    config.shop.keys_dir.clone().or_else(default_keys_dir)
}

/// Reject configs the features cannot run with
pub fn validate(config: &EconomyConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::Invalid(msg));

    if config.wallet.starting_balance < 0 {
        return invalid("wallet.starting_balance must not be negative".into());
    }

    for (name, cap) in [
        ("afk", config.afk.limit.cap),
        ("reward_links", config.reward_links.limit.cap),
        ("spin_wheel", config.spin_wheel.limit.cap),
    ] {
        if cap == 0 {
            return invalid(format!("{name}.limit.cap must be at least 1"));
        }
    }

    if config.afk.coin_interval_secs == 0 || config.afk.coins_per_interval == 0 {
        return invalid("afk interval and coins per interval must be at least 1".into());
    }

    if config.reward_links.links.is_empty() {
        return invalid("reward_links needs at least one link".into());
    }
    let mut ids = HashSet::new();
    for link in &config.reward_links.links {
        if link.coins == 0 {
            return invalid(format!("reward link {} pays no coins", link.id));
        }
        if !ids.insert(link.id) {
            return invalid(format!("duplicate reward link id {}", link.id));
        }
    }

    let segments = &config.spin_wheel.segments;
    if segments.is_empty() || segments.iter().all(|s| s.weight == 0) {
        return invalid("spin_wheel needs at least one segment with a weight".into());
    }

    if config.daily_reward.cooldown_hours == 0 || config.daily_reward.coins == 0 {
        return invalid("daily_reward cooldown and coins must be at least 1".into());
    }
    if config.leaderboard.cooldown_days == 0 || config.leaderboard.size == 0 {
        return invalid("leaderboard size and cooldown must be at least 1".into());
    }

    let mut ids = HashSet::new();
    for item in &config.shop.items {
        if item.price == 0 {
            return invalid(format!("shop item {} has no price", item.id));
        }
        if !ids.insert(item.id.as_str()) {
            return invalid(format!("duplicate shop item id {}", item.id));
        }
    }

    if config.admin.adjust_limit < 1 {
        return invalid("admin.adjust_limit must be at least 1".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("spdm-config-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_defaults_are_valid() {
        validate(&EconomyConfig::default()).unwrap();
    }

    #[test]
    fn test_save_then_load_file() {
        let path = temp_path("roundtrip.toml");
        let mut config = EconomyConfig::default();
        config.afk.limit.cap = 40;
        config.shop.keys_dir = Some(PathBuf::from("/srv/keys"));

        save_file(&path, &config).unwrap();
        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded, config);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial.toml");
        fs::write(&path, "[daily_reward]\ncoins = 25\n").unwrap();
        let config = load_file(&path).unwrap();
        assert_eq!(config.daily_reward.coins, 25);
        assert_eq!(config.daily_reward.cooldown_hours, 24);
        assert_eq!(config.afk, EconomyConfig::default().afk);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let missing = load_file(Path::new("/nonexistent/spdm.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let path = temp_path("broken.toml");
        fs::write(&path, "[afk\ncap = ").unwrap();
        assert!(matches!(load_file(&path), Err(ConfigError::Parse { .. })));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EconomyConfig::default();
        config.afk.limit.cap = 0;
        assert!(validate(&config).is_err());

        let mut config = EconomyConfig::default();
        let dup = config.reward_links.links[0].clone();
        config.reward_links.links.push(dup);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate reward link"));

        let mut config = EconomyConfig::default();
        config.spin_wheel.segments.iter_mut().for_each(|s| s.weight = 0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_keys_dir_prefers_config() {
        let mut config = EconomyConfig::default();
        config.shop.keys_dir = Some(PathBuf::from("/srv/keys"));
        assert_eq!(keys_dir(&config), Some(PathBuf::from("/srv/keys")));
    }
}
