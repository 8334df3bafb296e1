use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use padloop_types::{ArpPattern, Key, Scale};

use crate::arpeggiator::ARP_MAX_OCTAVES;
use crate::looper::LooperLimits;
use crate::settings::InstrumentSettings;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

const MAX_OCTAVE: u8 = 9;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "read error: {}", e),
            ConfigError::Toml(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Toml(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    arpeggiator: ArpConfig,
    #[serde(default)]
    looper: LooperConfig,
    #[serde(default)]
    pads: PadsConfig,
}

#[derive(Deserialize, Default)]
struct ArpConfig {
    pattern: Option<String>,
    speed_ms: Option<u32>,
    speed_min_ms: Option<u32>,
    speed_max_ms: Option<u32>,
    octaves: Option<u8>,
    gate_percent: Option<u8>,
}

#[derive(Deserialize, Default)]
struct LooperConfig {
    enabled: Option<bool>,
    max_events: Option<usize>,
    max_length_ms: Option<u32>,
    refresh_interval_ms: Option<u32>,
}

#[derive(Deserialize, Default)]
struct PadsConfig {
    key: Option<String>,
    octave: Option<u8>,
    scale: Option<String>,
}

pub struct Config {
    arpeggiator: ArpConfig,
    looper: LooperConfig,
    pads: PadsConfig,
}

impl Config {
    /// Embedded defaults overlaid with the user's config file, if any.
    /// Problems with the user file are logged and the file is skipped.
    pub fn load() -> Self {
        let mut base = Self::embedded();

        if let Some(path) = user_config_path() {
            if path.exists() {
                match read_file(&path) {
                    Ok(user) => base.merge(user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring config {}: {}", path.display(), e)
                    }
                }
            }
        }

        base
    }

    /// Embedded defaults overlaid with `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let user: ConfigFile = toml::from_str(contents)?;
        let mut base = Self::embedded();
        base.merge(user);
        Ok(base)
    }

    fn embedded() -> Self {
        let file = toml::from_str::<ConfigFile>(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });
        Config {
            arpeggiator: file.arpeggiator,
            looper: file.looper,
            pads: file.pads,
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_arpeggiator(&mut self.arpeggiator, user.arpeggiator);
        merge_looper(&mut self.looper, user.looper);
        merge_pads(&mut self.pads, user.pads);
    }

    pub fn arp_pattern(&self) -> ArpPattern {
        self.arpeggiator
            .pattern
            .as_deref()
            .and_then(ArpPattern::parse)
            .unwrap_or_default()
    }

    /// Step interval floor and ceiling, floor at least 1 ms and ceiling not
    /// below the floor.
    pub fn arp_speed_bounds_ms(&self) -> (u32, u32) {
        let fallback = InstrumentSettings::default();
        let floor = self
            .arpeggiator
            .speed_min_ms
            .unwrap_or(fallback.arp_speed_min_ms)
            .max(1);
        let ceiling = self
            .arpeggiator
            .speed_max_ms
            .unwrap_or(fallback.arp_speed_max_ms)
            .max(floor);
        (floor, ceiling)
    }

    pub fn arp_speed_ms(&self) -> u32 {
        let (floor, ceiling) = self.arp_speed_bounds_ms();
        self.arpeggiator
            .speed_ms
            .unwrap_or(InstrumentSettings::default().arp_speed_ms)
            .clamp(floor, ceiling)
    }

    pub fn arp_octaves(&self) -> u8 {
        self.arpeggiator.octaves.unwrap_or(1).clamp(1, ARP_MAX_OCTAVES)
    }

    pub fn arp_gate_percent(&self) -> u8 {
        self.arpeggiator
            .gate_percent
            .unwrap_or(InstrumentSettings::default().arp_gate_percent)
            .clamp(1, 100)
    }

    pub fn looper_enabled(&self) -> bool {
        self.looper.enabled.unwrap_or(true)
    }

    pub fn looper_limits(&self) -> LooperLimits {
        let fallback = LooperLimits::default();
        LooperLimits {
            max_events: self.looper.max_events.unwrap_or(fallback.max_events).max(1),
            max_length_ms: self
                .looper
                .max_length_ms
                .unwrap_or(fallback.max_length_ms)
                .max(1),
            refresh_interval_ms: self
                .looper
                .refresh_interval_ms
                .unwrap_or(fallback.refresh_interval_ms)
                .max(1),
        }
    }

    pub fn key(&self) -> Key {
        self.pads
            .key
            .as_deref()
            .and_then(Key::parse)
            .unwrap_or_default()
    }

    pub fn octave(&self) -> u8 {
        self.pads.octave.unwrap_or(4).min(MAX_OCTAVE)
    }

    pub fn scale(&self) -> Scale {
        self.pads
            .scale
            .as_deref()
            .and_then(Scale::parse)
            .unwrap_or_default()
    }

    /// Starting front-panel settings.
    pub fn settings(&self) -> InstrumentSettings {
        let (arp_speed_min_ms, arp_speed_max_ms) = self.arp_speed_bounds_ms();
        InstrumentSettings {
            arp_pattern: self.arp_pattern(),
            arp_speed_ms: self.arp_speed_ms(),
            arp_speed_min_ms,
            arp_speed_max_ms,
            arp_octaves: self.arp_octaves(),
            arp_gate_percent: self.arp_gate_percent(),
            key: self.key(),
            octave: self.octave(),
            scale: self.scale(),
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("padloop").join("config.toml"))
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn merge_arpeggiator(base: &mut ArpConfig, user: ArpConfig) {
    if user.pattern.is_some() {
        base.pattern = user.pattern;
    }
    if user.speed_ms.is_some() {
        base.speed_ms = user.speed_ms;
    }
    if user.speed_min_ms.is_some() {
        base.speed_min_ms = user.speed_min_ms;
    }
    if user.speed_max_ms.is_some() {
        base.speed_max_ms = user.speed_max_ms;
    }
    if user.octaves.is_some() {
        base.octaves = user.octaves;
    }
    if user.gate_percent.is_some() {
        base.gate_percent = user.gate_percent;
    }
}

fn merge_looper(base: &mut LooperConfig, user: LooperConfig) {
    if user.enabled.is_some() {
        base.enabled = user.enabled;
    }
    if user.max_events.is_some() {
        base.max_events = user.max_events;
    }
    if user.max_length_ms.is_some() {
        base.max_length_ms = user.max_length_ms;
    }
    if user.refresh_interval_ms.is_some() {
        base.refresh_interval_ms = user.refresh_interval_ms;
    }
}

fn merge_pads(base: &mut PadsConfig, user: PadsConfig) {
    if user.key.is_some() {
        base.key = user.key;
    }
    if user.octave.is_some() {
        base.octave = user.octave;
    }
    if user.scale.is_some() {
        base.scale = user.scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.arpeggiator.pattern.is_some());
        assert!(config.looper.max_events.is_some());
        assert!(config.pads.scale.is_some());
    }

    #[test]
    fn defaults_match_settings_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.settings(), InstrumentSettings::default());
        assert_eq!(config.looper_limits(), LooperLimits::default());
        assert!(config.looper_enabled());
    }

    #[test]
    fn user_values_override_per_field() {
        let config = Config::from_toml_str(
            r#"
            [arpeggiator]
            pattern = "up-down"
            octaves = 2

            [pads]
            key = "Eb"
            "#,
        )
        .unwrap();
        assert_eq!(config.arp_pattern(), ArpPattern::UpDown);
        assert_eq!(config.arp_octaves(), 2);
        // Untouched fields keep their embedded values.
        assert_eq!(config.arp_speed_ms(), 500);
        assert_eq!(config.key(), Key::Ds);
        assert_eq!(config.octave(), 4);
        assert_eq!(config.scale(), Scale::PentatonicMajor);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = Config::from_toml_str(
            r#"
            [arpeggiator]
            speed_ms = 1
            speed_min_ms = 0
            speed_max_ms = 0
            octaves = 9
            gate_percent = 0

            [looper]
            max_events = 0
            max_length_ms = 0
            refresh_interval_ms = 0

            [pads]
            octave = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.arp_speed_bounds_ms(), (1, 1));
        assert_eq!(config.arp_speed_ms(), 1);
        assert_eq!(config.arp_octaves(), 3);
        assert_eq!(config.arp_gate_percent(), 1);
        let limits = config.looper_limits();
        assert_eq!(limits.max_events, 1);
        assert_eq!(limits.max_length_ms, 1);
        assert_eq!(limits.refresh_interval_ms, 1);
        assert_eq!(config.octave(), 9);
    }

    #[test]
    fn speed_is_clamped_into_bounds() {
        let config = Config::from_toml_str(
            r#"
            [arpeggiator]
            speed_ms = 10000
            "#,
        )
        .unwrap();
        assert_eq!(config.arp_speed_ms(), 2000);
    }

    #[test]
    fn unknown_names_fall_back_to_defaults() {
        let config = Config::from_toml_str(
            r#"
            [arpeggiator]
            pattern = "sideways"

            [pads]
            key = "H"
            scale = "Nope"
            "#,
        )
        .unwrap();
        assert_eq!(config.arp_pattern(), ArpPattern::Off);
        assert_eq!(config.key(), Key::C);
        assert_eq!(config.scale(), Scale::PentatonicMajor);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = Config::from_toml_str("[arpeggiator\nspeed_ms = ").err();
        assert!(matches!(err, Some(ConfigError::Toml(_))));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let err = Config::from_toml_str("[looper]\nenabled = \"yes\"").err();
        assert!(matches!(err, Some(ConfigError::Toml(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_file(Path::new("/nonexistent/padloop/config.toml")).err();
        assert!(matches!(err, Some(ConfigError::Io(_))));
    }
}
