//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;

/// Write a default configuration file for `channel`
pub fn cmd_init(config_path: &Path, channel: &str, force: bool) -> Result<Config> {
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let config = Config {
        channel: channel.to_string(),
        config_file: config_path.to_path_buf(),
        ..Config::default()
    };
    config.validate()?;
    config.save()?;

    Ok(config)
}

/// Print where the config went and which variables it expects
pub fn print_init_summary(config: &Config) {
    println!("✓ Wrote {}", config.config_file.display());
    println!("\nSet these environment variables before syncing:");
    for name in [
        &config.source.api_id_env,
        &config.source.api_hash_env,
        &config.source.session_env,
        &config.ocr.subscription_key_env,
        &config.ocr.endpoint_env,
    ] {
        println!("  {}", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("channel-archiver.toml");

        cmd_init(&path, "TranslationGrass", false).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.channel, "TranslationGrass");
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("channel-archiver.toml");

        cmd_init(&path, "first", false).unwrap();
        assert!(matches!(cmd_init(&path, "second", false), Err(Error::Config(_))));

        cmd_init(&path, "second", true).unwrap();
        assert_eq!(Config::load(&path).unwrap().channel, "second");
    }

    #[test]
    fn test_init_rejects_empty_channel() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("channel-archiver.toml");
        assert!(cmd_init(&path, "  ", false).is_err());
        assert!(!path.exists());
    }
}
