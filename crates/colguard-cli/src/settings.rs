use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use colguard_core::Mode;

use crate::CliError;

/// Settings file picked up from the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "colguard.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
    Insert,
    Update,
}

impl From<ModeSetting> for Mode {
    fn from(value: ModeSetting) -> Self {
        match value {
            ModeSetting::Insert => Mode::Insert,
            ModeSetting::Update => Mode::Update,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    pub use_cache: bool,
    pub mode: ModeSetting,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            use_cache: false,
            mode: ModeSetting::Insert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `COLGUARD_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub validator: ValidatorSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }
}

/// Load `explicit`, or the default file when it exists, or defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if !fallback.exists() {
                return Ok(Settings::default());
            }
            fallback
        }
    };
    let content = std::fs::read_to_string(&path).map_err(|err| CliError::Settings {
        path: path.display().to_string(),
        source: err,
    })?;
    Settings::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!settings.validator.use_cache);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn sections_are_partial() {
        let settings = Settings::from_toml(
            r#"
            [validator]
            mode = "update"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(Mode::from(settings.validator.mode), Mode::Update);
        assert!(!settings.validator.use_cache);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert!(Settings::from_toml("[validator]\nmode = \"upsert\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_settings(Some(Path::new("does/not/exist.toml"))).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
