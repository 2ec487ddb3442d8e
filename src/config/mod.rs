use crate::models::BundleConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Prefix of environment variables overriding configuration values,
/// e.g. `HELPBUNDLE_INPUT_DIR=docs/en-US`.
pub const ENV_PREFIX: &str = "HELPBUNDLE";

/// Configuration manager for the bundle configuration file.
///
/// Values are layered: compiled-in defaults, then the YAML file (if present),
/// then `HELPBUNDLE_*` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager for the given configuration file.
    ///
    /// The file does not need to exist.
    pub fn new<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load the bundle configuration.
    ///
    /// # Returns
    /// The layered BundleConfig, or defaults if neither file nor environment set anything
    pub fn load_config(&self) -> Result<BundleConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
        }

        let layered = Config::builder()
            .add_source(
                File::new(self.config_path.as_str(), FileFormat::Yaml).required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: BundleConfig = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the bundle configuration as YAML.
    ///
    /// # Arguments
    /// * `config` - The BundleConfig to save
    pub fn save_config(&self, config: &BundleConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        if let Some(parent) = self.config_path.parent()
            && !parent.as_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent))?;
        }

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(dir.join("help_bundle.yaml"));
        (manager, temp_dir)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let config = manager.load_config().unwrap();
        assert_eq!(config.help_files, BundleConfig::default().help_files);
        assert_eq!(config.variants, BundleConfig::default().variants);
    }

    #[test]
    fn test_save_then_load() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = BundleConfig::default();
        config.placeholders = vec!["Only.html".to_string()];
        config.resolver.timeout_secs = 5;
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.placeholders, vec!["Only.html".to_string()]);
        assert_eq!(loaded.resolver.timeout_secs, 5);
        assert_eq!(loaded.variants, config.variants);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.config_path(), "help_files: {not: [a list").unwrap();
        assert!(manager.load_config().is_err());
    }
}
