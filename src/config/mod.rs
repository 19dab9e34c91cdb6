use crate::models::LauncherSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Manager for the launcher's YAML settings file.
///
/// The settings live in a single `arkbooter.yaml` inside the configuration
/// directory; a missing file yields defaults rather than an error.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl SettingsManager {
    /// Create a new SettingsManager with the specified configuration
    /// directory, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("arkbooter.yaml"),
            config_dir,
        })
    }

    /// Load the settings file, or defaults if it doesn't exist.
    pub fn load_settings(&self) -> Result<LauncherSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(LauncherSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: LauncherSettings = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &LauncherSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
