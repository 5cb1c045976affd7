// src/config.rs
//! Configuration file handling

use crate::error::{GpsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A custom field to register with the decoder at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldConfig {
    pub sentence: String,
    pub term: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    pub serial_port: Option<String>,
    pub serial_baudrate: u32,
    pub refresh_ms: u64,
    pub log_level: String,
    pub custom_fields: Vec<CustomFieldConfig>,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            // NEO-6M factory default
            serial_baudrate: 9600,
            refresh_ms: 1000,
            log_level: "info".to_string(),
            custom_fields: Vec::new(),
        }
    }
}

impl GpsConfig {
    /// Load configuration from the default location, falling back to
    /// defaults if there is no config file yet
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpsError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GpsError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GpsError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(path, contents)
            .map_err(|e| GpsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Config file path, `$HOME/.config/gps-tracker/config.json`
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("gps-tracker").join("config.json"))
    }

    /// Reject values the rest of the program cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.serial_baudrate == 0 {
            return Err(GpsError::Config("serial_baudrate must be non-zero".to_string()));
        }
        if self.refresh_ms == 0 {
            return Err(GpsError::Config("refresh_ms must be non-zero".to_string()));
        }
        if let Some(field) = self.custom_fields.iter().find(|f| f.sentence.is_empty() || f.term == 0) {
            return Err(GpsError::Config(format!(
                "Invalid custom field {:?}: needs a sentence name and a term index of 1 or more",
                field
            )));
        }
        Ok(())
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.serial_port = Some(port);
        self.serial_baudrate = baudrate;
    }

    pub fn add_custom_field(&mut self, sentence: &str, term: u8) {
        let field = CustomFieldConfig {
            sentence: sentence.to_string(),
            term,
        };
        if !self.custom_fields.contains(&field) {
            self.custom_fields.push(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("gps-tracker-test-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = GpsConfig::default();
        assert_eq!(config.serial_baudrate, 9600);
        assert_eq!(config.refresh_ms, 1000);
        assert!(config.serial_port.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_update_serial() {
        let mut config = GpsConfig::default();
        config.update_serial("/dev/ttyUSB0".to_string(), 115200);
        assert_eq!(config.serial_port, Some("/dev/ttyUSB0".to_string()));
        assert_eq!(config.serial_baudrate, 115200);
    }

    #[test]
    fn test_add_custom_field_dedups() {
        let mut config = GpsConfig::default();
        config.add_custom_field("GPRMC", 7);
        config.add_custom_field("GPRMC", 7);
        config.add_custom_field("GPGSA", 15);
        assert_eq!(config.custom_fields.len(), 2);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: GpsConfig =
            serde_json::from_str(r#"{"serial_port": "/dev/ttyS0"}"#).unwrap();
        assert_eq!(config.serial_port.as_deref(), Some("/dev/ttyS0"));
        assert_eq!(config.serial_baudrate, 9600);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GpsConfig::default();
        config.serial_baudrate = 0;
        assert!(config.validate().is_err());

        let mut config = GpsConfig::default();
        config.add_custom_field("GPRMC", 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_path("roundtrip");
        let mut config = GpsConfig::default();
        config.update_serial("/dev/ttyAMA0".to_string(), 38400);
        config.add_custom_field("GPGSV", 3);
        config.save_to(&path).unwrap();

        let loaded = GpsConfig::load_from(&path).unwrap();
        assert_eq!(loaded.serial_port, config.serial_port);
        assert_eq!(loaded.serial_baudrate, 38400);
        assert_eq!(loaded.custom_fields, config.custom_fields);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let loaded = GpsConfig::load_from(&temp_path("missing")).unwrap();
        assert_eq!(loaded.serial_baudrate, 9600);
    }
}
