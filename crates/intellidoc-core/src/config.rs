use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root config directory (~/.config/intellidoc)
    pub config_dir: PathBuf,
    /// User settings file
    pub settings_file: PathBuf,
}

impl Config {
    /// Load configuration or use defaults
    pub fn load_or_default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("intellidoc");

        Self::in_dir(config_dir)
    }

    /// Configuration rooted at an explicit directory
    pub fn in_dir(config_dir: PathBuf) -> Self {
        Self {
            settings_file: config_dir.join("settings.json"),
            config_dir,
        }
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        Ok(())
    }
}

/// User-tunable settings, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound on a single backend call
    pub backend_timeout_secs: u64,
    /// Simulated latency of the mock backend
    pub mock_latency_ms: u64,
    /// File extensions the upload view offers (hint only, never enforced by the store)
    pub accepted_extensions: Vec<String>,
}

/// Backend timeout used when none (or zero) is configured
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
            mock_latency_ms: 1200,
            accepted_extensions: vec!["pdf".to_string(), "docx".to_string(), "txt".to_string()],
        }
    }
}

impl Settings {
    /// Load settings from disk, falling back to defaults when the file is
    /// missing or unreadable. Unusable values are replaced by their defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .context("Failed to read settings file")
            .and_then(|content| {
                serde_json::from_str(&content).context("Failed to parse settings JSON")
            }) {
            Ok(settings) => Self::sanitized(settings),
            Err(e) => {
                tracing::warn!("Using default settings ({:?}): {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Replace values that would make every backend call fail.
    ///
    /// A zero timeout expires before any call can finish, so it falls back to
    /// the default with a warning.
    pub fn sanitized(mut self) -> Self {
        if self.backend_timeout_secs == 0 {
            tracing::warn!(
                default = DEFAULT_BACKEND_TIMEOUT_SECS,
                "backend_timeout_secs must be at least 1, using the default"
            );
            self.backend_timeout_secs = DEFAULT_BACKEND_TIMEOUT_SECS;
        }
        self
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content).context("Failed to write settings file")?;
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn mock_latency(&self) -> Duration {
        Duration::from_millis(self.mock_latency_ms)
    }

    /// Whether the upload view lists this extension
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.accepted_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&temp_dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_settings_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(temp_dir.path().join("intellidoc"));
        config.ensure_dirs().unwrap();

        let settings = Settings {
            backend_timeout_secs: 5,
            mock_latency_ms: 0,
            accepted_extensions: vec!["md".to_string()],
        };
        settings.save(&config.settings_file).unwrap();

        assert_eq!(Settings::load(&config.settings_file), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"mock_latency_ms": 10}"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.mock_latency(), Duration::from_millis(10));
        assert_eq!(settings.backend_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_zero_timeout_falls_back_to_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"backend_timeout_secs": 0, "mock_latency_ms": 0}"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.backend_timeout(), Duration::from_secs(30));
        assert_eq!(settings.mock_latency_ms, 0);
    }

    #[test]
    fn test_sanitized_keeps_valid_timeout() {
        let settings = Settings {
            backend_timeout_secs: 1,
            ..Settings::default()
        };
        assert_eq!(settings.clone().sanitized(), settings);
    }

    #[test]
    fn test_accepts_extension() {
        let settings = Settings::default();
        assert!(settings.accepts_extension("pdf"));
        assert!(settings.accepts_extension("DOCX"));
        assert!(!settings.accepts_extension("exe"));
    }
}
