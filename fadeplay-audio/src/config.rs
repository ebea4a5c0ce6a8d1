use std::{
    fs::File,
    io::{Error, ErrorKind, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use fadeplay_core::{format::DEFAULT_BANK_EXTENSION, Easing};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Logger configuration for the driver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { level_filter: LevelFilter::Info }
    }
}

/// Main configuration of a [`SoundPlayer`](crate::SoundPlayer).
/// Use [`SoundPlayerConfigBuilder`] to build it from code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundPlayerConfig {
    /// Fade-out time used when a caller does not pass one, in seconds.
    pub stop_fade_secs: f64,
    /// Fade-in time used when a caller does not pass one, in seconds.
    pub play_fade_secs: f64,
    pub easing: Easing,
    /// Control reset to 0 on every BGM channel at startup.
    pub default_control_name: String,
    /// Directory scanned for bank files.
    pub bank_dir: Option<PathBuf>,
    pub bank_extension: String,
    pub logger_config: Option<LoggerConfig>,
}

impl Default for SoundPlayerConfig {
    fn default() -> Self {
        Self {
            stop_fade_secs: 0.2,
            play_fade_secs: 0.2,
            easing: Easing::Linear,
            default_control_name: "AisacControl_00".to_string(),
            bank_dir: None,
            bank_extension: DEFAULT_BANK_EXTENSION.to_string(),
            logger_config: Some(Default::default()),
        }
    }
}

impl SoundPlayerConfig {
    pub fn stop_fade(&self) -> Duration {
        Duration::from_secs_f64(self.stop_fade_secs.max(0.0))
    }

    pub fn play_fade(&self) -> Duration {
        Duration::from_secs_f64(self.play_fade_secs.max(0.0))
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.logger_config
            .as_ref()
            .map(|config| config.level_filter)
            .unwrap_or(LevelFilter::Info)
    }
}

/// Convenience builder to create a `SoundPlayerConfig` from code.
#[derive(Default)]
pub struct SoundPlayerConfigBuilder {
    config: SoundPlayerConfig,
}

impl SoundPlayerConfigBuilder {
    pub fn new() -> Self {
        Self { config: Default::default() }
    }

    pub fn with_fade_times(mut self, stop: Duration, play: Duration) -> Self {
        self.config.stop_fade_secs = stop.as_secs_f64();
        self.config.play_fade_secs = play.as_secs_f64();
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.config.easing = easing;
        self
    }

    pub fn with_default_control_name(mut self, name: impl Into<String>) -> Self {
        self.config.default_control_name = name.into();
        self
    }

    /// Sets the directory scanned for banks, and the file extension that marks one.
    pub fn with_bank_dir(mut self, dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        self.config.bank_dir = Some(dir.into());
        self.config.bank_extension = extension.into();
        self
    }

    pub fn with_logger_config(mut self, logger_config: LoggerConfig) -> Self {
        self.config.logger_config = Some(logger_config);
        self
    }

    /// Retrieves the configuration built
    pub fn get(self) -> SoundPlayerConfig {
        self.config
    }
}

pub struct SoundPlayerConfigReader;

impl SoundPlayerConfigReader {
    /// Reads `path`, writing the default configuration there first if it does not exist.
    pub fn read_or_default(path: &Path) -> Result<SoundPlayerConfig, Error> {
        if !path.exists() {
            log::info!("couldn't find {}, generating a default configuration", path.display());
            let config = SoundPlayerConfig::default();
            let mut file = File::create(path)?;
            file.write_all(serde_json::to_vec_pretty(&config)?.as_slice())?;
            return Ok(config);
        }
        Self::read_config(path)
    }

    pub fn read_json(path: &Path) -> Result<SoundPlayerConfig, Error> {
        if !path.exists() {
            return Err(Error::new(ErrorKind::NotFound, "File not found"));
        }
        Self::read_config(path)
    }

    fn read_config(path: &Path) -> Result<SoundPlayerConfig, Error> {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let config = serde_json::from_slice(bytes.as_slice())?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let config: SoundPlayerConfig =
            serde_json::from_str(r#"{"play_fade_secs": 1.5, "easing": "out_quad"}"#).unwrap();
        assert_eq!(config.play_fade(), Duration::from_millis(1500));
        assert_eq!(config.stop_fade(), Duration::from_millis(200));
        assert_eq!(config.easing, Easing::OutQuad);
        assert_eq!(config.default_control_name, "AisacControl_00");
    }

    #[test]
    fn default_fade_times_are_exact() {
        let config = SoundPlayerConfig::default();
        assert_eq!(config.stop_fade(), Duration::from_millis(200));
        assert_eq!(config.play_fade(), Duration::from_millis(200));

        let config = SoundPlayerConfigBuilder::new()
            .with_fade_times(Duration::from_millis(250), Duration::from_millis(1500))
            .get();
        assert_eq!(config.stop_fade(), Duration::from_millis(250));
        assert_eq!(config.play_fade(), Duration::from_millis(1500));
    }

    #[test]
    fn read_or_default_writes_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fadeplay.json");

        let created = SoundPlayerConfigReader::read_or_default(&path).unwrap();
        assert!(path.exists());
        let read = SoundPlayerConfigReader::read_json(&path).unwrap();
        assert_eq!(created, read);
    }

    #[test]
    fn read_json_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SoundPlayerConfigReader::read_json(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn builder_sets_fields() {
        let config = SoundPlayerConfigBuilder::new()
            .with_fade_times(Duration::from_secs(1), Duration::from_millis(500))
            .with_default_control_name("Filter")
            .with_logger_config(LoggerConfig { level_filter: LevelFilter::Debug })
            .get();
        assert_eq!(config.stop_fade(), Duration::from_secs(1));
        assert_eq!(config.play_fade(), Duration::from_millis(500));
        assert_eq!(config.default_control_name, "Filter");
        assert_eq!(config.level_filter(), LevelFilter::Debug);
    }
}
