use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OPTIONS_PATH: &str = "data/options.json";

/// Runtime settings for the show engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Broker connection for whatever owns the other end of a
    /// `ChannelTransport`. The engine only validates and stores these; the
    /// bundled CLI publishes through `LogTransport` and never connects.
    pub mqtt_host: String,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub log_level: String,
    /// JSON document holding shows, scenes and devices.
    pub store_path: PathBuf,
    /// Seconds after startup during which inbound show commands are ignored.
    pub inbound_grace_secs: u64,
    /// Number of inbound messages kept for display.
    pub message_history: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mqtt_host: String::new(),
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            log_level: "info".to_string(),
            store_path: PathBuf::from("data/shows.json"),
            inbound_grace_secs: 5,
            message_history: 50,
        }
    }
}

impl Settings {
    /// `log_level` as a filter. Unknown levels fall back to info.
    pub fn log_filter(&self) -> log::LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "debug" => log::LevelFilter::Debug,
            "warning" | "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }

    pub fn inbound_grace(&self) -> Duration {
        Duration::from_secs(self.inbound_grace_secs)
    }

    pub fn has_broker(&self) -> bool {
        !self.mqtt_host.is_empty()
    }

    /// Every problem found, not just the first.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.inbound_grace_secs > 300 {
            problems.push(format!(
                "inbound_grace_secs is {}, at most 300 allowed",
                self.inbound_grace_secs
            ));
        }
        if self.message_history > 10_000 {
            problems.push(format!(
                "message_history is {}, at most 10000 allowed",
                self.message_history
            ));
        }
        if self.store_path.as_os_str().is_empty() {
            problems.push("store_path is empty".to_string());
        }

        // Credentials without a host, or a host with half the credentials.
        let credentials = [&self.mqtt_user, &self.mqtt_pass]
            .iter()
            .filter(|v| !v.is_empty())
            .count();
        if self.mqtt_host.is_empty() && credentials > 0 {
            problems.push("mqtt_user/mqtt_pass given without mqtt_host".to_string());
        } else if credentials == 1 {
            problems.push("mqtt_user and mqtt_pass must be given together".to_string());
        }

        problems
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}

/// On-disk layout of the options file.
#[derive(Debug, Serialize, Deserialize)]
struct OptionsFile {
    /// Engine version that last wrote the file.
    version: String,
    saved_at: String,
    #[serde(default)]
    settings: Settings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{} is not a valid options file: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot encode settings: {0}")]
    Serialize(serde_json::Error),
    #[error("invalid settings: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Owns the options file. A missing file is created with defaults on
/// first load.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_OPTIONS_PATH)),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.path.exists() {
            log::info!("No options at {}, writing defaults", self.path.display());
            self.save()?;
            return Ok(self.settings.clone());
        }

        let text = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let file: OptionsFile = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "{} was written by version {}; missing settings take their defaults",
                self.path.display(),
                file.version
            );
        }
        file.settings.validate()?;

        self.settings = file.settings;
        Ok(self.settings.clone())
    }

    /// Validates and stores `settings`, then writes the file.
    pub fn replace(&mut self, settings: Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.settings = settings;
        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_error)?;
        }

        let file = OptionsFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            settings: self.settings.clone(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(ConfigError::Serialize)?;
        fs::write(&self.path, text).map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("options.json");

        let mut config = ConfigManager::new(Some(path.clone()));
        assert_eq!(config.load().unwrap(), Settings::default());
        assert!(path.exists());

        // A second manager reads back what the first one wrote.
        let reread = ConfigManager::new(Some(path)).load().unwrap();
        assert_eq!(reread, Settings::default());
    }

    #[test]
    fn test_replace_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");

        let settings = Settings {
            mqtt_host: "tcp://broker:1883".to_string(),
            mqtt_user: "lights".to_string(),
            mqtt_pass: "secret".to_string(),
            log_level: "debug".to_string(),
            message_history: 10,
            ..Default::default()
        };
        ConfigManager::new(Some(path.clone()))
            .replace(settings.clone())
            .unwrap();

        let loaded = ConfigManager::new(Some(path)).load().unwrap();
        assert_eq!(loaded, settings);
        assert!(loaded.has_broker());
    }

    #[test]
    fn test_missing_settings_take_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(
            &path,
            r#"{"version": "0.0.1", "saved_at": "", "settings": {"log_level": "error"}}"#,
        )
        .unwrap();

        let loaded = ConfigManager::new(Some(path)).load().unwrap();
        assert_eq!(loaded.log_level, "error");
        assert_eq!(loaded.message_history, 50);
        assert_eq!(loaded.inbound_grace(), Duration::from_secs(5));
    }

    #[test]
    fn test_unreadable_json_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ConfigManager::new(Some(path)).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_replace_rejects_invalid_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");
        let mut config = ConfigManager::new(Some(path.clone()));

        let err = config
            .replace(Settings {
                inbound_grace_secs: 1000,
                mqtt_user: "lights".to_string(),
                ..Default::default()
            })
            .unwrap_err();

        match err {
            ConfigError::Validation(problems) => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!path.exists());
        assert_eq!(config.settings(), &Settings::default());
    }

    #[test]
    fn test_half_credentials_are_invalid() {
        let settings = Settings {
            mqtt_host: "tcp://broker:1883".to_string(),
            mqtt_user: "lights".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.problems().len(), 1);

        let anonymous = Settings {
            mqtt_host: "tcp://broker:1883".to_string(),
            ..Default::default()
        };
        assert!(anonymous.validate().is_ok());
    }

    #[test]
    fn test_log_filter() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_filter(), log::LevelFilter::Info);

        settings.log_level = "Warning".to_string();
        assert_eq!(settings.log_filter(), log::LevelFilter::Warn);

        settings.log_level = "verbose".to_string();
        assert_eq!(settings.log_filter(), log::LevelFilter::Info);
    }
}
