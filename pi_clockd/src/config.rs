use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

pub const MIN_POLL_INTERVAL: u64 = 1;
pub const MAX_POLL_INTERVAL: u64 = 30;
pub const MIN_TELEMETRY_INTERVAL: u64 = 10;

/// Daemon configuration, read from `config.toml`.
/// The alarms themselves live in a separate JSON document at `alarms_path`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub alarms_path: PathBuf,
    pub socket_name: String,
    pub poll_interval_secs: u64,
    /// name in `sounds` used when an alarm has no sound of its own
    pub default_sound: String,
    pub sounds: BTreeMap<String, PathBuf>,
    pub alert: AlertConfig,
    pub backlight: BacklightConfig,
    pub weather: WeatherConfig,
    pub telemetry: TelemetryConfig,
    pub rtc: RtcConfig,
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        let sounds_path = Self::sounds_path();
        Self {
            alarms_path: Self::data_path().join("alarms.json"),
            socket_name: "pi-clockd.sock".to_string(),
            poll_interval_secs: 1,
            default_sound: "beep beep".to_string(),
            sounds: [
                ("ring", "ring.mp3"),
                ("bing bong", "bing_bong.mp3"),
                ("tick tock", "tick_tock.mp3"),
                ("beep beep", "beep_beep.mp3"),
                ("rain", "rain.mp3"),
            ]
            .into_iter()
            .map(|(name, file)| (name.to_string(), sounds_path.join(file)))
            .collect(),
            alert: AlertConfig::default(),
            backlight: BacklightConfig::default(),
            weather: WeatherConfig::default(),
            telemetry: TelemetryConfig::default(),
            rtc: RtcConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config at `path`, or the defaults when there is no file.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reports every problem at once rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: String| {
            if !ok {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message,
                });
            }
        };

        check(
            !self.socket_name.is_empty(),
            "socket_name",
            "socket name cannot be empty".to_string(),
        );
        check(
            (MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&self.poll_interval_secs),
            "poll_interval_secs",
            format!(
                "poll interval {} must be between {MIN_POLL_INTERVAL} and {MAX_POLL_INTERVAL} seconds",
                self.poll_interval_secs
            ),
        );
        check(
            self.weather.refresh_minutes >= 1,
            "weather.refresh_minutes",
            "refresh interval must be at least 1 minute".to_string(),
        );
        check(
            self.telemetry.interval_secs >= MIN_TELEMETRY_INTERVAL,
            "telemetry.interval_secs",
            format!(
                "telemetry interval {} is too short (minimum {MIN_TELEMETRY_INTERVAL} seconds)",
                self.telemetry.interval_secs
            ),
        );
        check(
            !self.rtc.hwclock.is_empty(),
            "rtc.hwclock",
            "hwclock program cannot be empty".to_string(),
        );
        match &self.alert {
            AlertConfig::Buzzer { on_ms, off_ms, .. } => check(
                *on_ms > 0 && *off_ms > 0,
                "alert.on_ms",
                "buzzer on/off durations must be positive".to_string(),
            ),
            AlertConfig::Command { program, .. } => check(
                !program.is_empty(),
                "alert.program",
                "player program cannot be empty".to_string(),
            ),
            AlertConfig::Console | AlertConfig::Player => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Path of a sound: a name from the sound table, otherwise taken as a path.
    /// `None` resolves the default sound.
    #[must_use]
    pub fn resolve_sound(&self, sound: Option<&str>) -> Option<PathBuf> {
        match sound {
            Some(name) => Some(
                self.sounds
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(name)),
            ),
            None => self.sounds.get(&self.default_sound).cloned(),
        }
    }

    #[must_use]
    pub fn config_path() -> PathBuf {
        project_dirs().map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    #[must_use]
    pub fn data_path() -> PathBuf {
        project_dirs().map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
    }

    #[must_use]
    pub fn sounds_path() -> PathBuf {
        Self::data_path().join("sounds")
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().exists()
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "pi_clock")
}

/// Which device sounds the alarm.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertConfig {
    /// only log, for machines without a buzzer or speaker
    Console,
    /// sysfs GPIO pin toggled on and off
    Buzzer {
        #[serde(default = "default_buzzer_pin")]
        pin: u32,
        #[serde(default = "default_beep_ms")]
        on_ms: u64,
        #[serde(default = "default_beep_ms")]
        off_ms: u64,
    },
    /// decode and play the sound file in process
    Player,
    /// run an external player; `{file}` and `{volume}` in `args` are substituted
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self::Buzzer {
            pin: default_buzzer_pin(),
            on_ms: default_beep_ms(),
            off_ms: default_beep_ms(),
        }
    }
}

impl fmt::Display for AlertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::Buzzer { pin, .. } => write!(f, "buzzer on GPIO {pin}"),
            Self::Player => write!(f, "audio player"),
            Self::Command { program, .. } => write!(f, "external player {program}"),
        }
    }
}

const fn default_buzzer_pin() -> u32 {
    23
}

const fn default_beep_ms() -> u64 {
    500
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BacklightConfig {
    pub enabled: bool,
    pub brightness_path: PathBuf,
    pub max_brightness_path: PathBuf,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            brightness_path: PathBuf::from("/sys/class/backlight/rpi_backlight/brightness"),
            max_brightness_path: PathBuf::from("/sys/class/backlight/rpi_backlight/max_brightness"),
        }
    }
}

/// OpenWeatherMap settings. An empty `api_key` disables weather.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub city: String,
    pub country: String,
    pub units: String,
    pub lang: String,
    pub refresh_minutes: u64,
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            city: String::new(),
            country: String::new(),
            units: "metric".to_string(),
            lang: "en".to_string(),
            refresh_minutes: 10,
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
        }
    }
}

impl WeatherConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.city.is_empty()
    }
}

/// Periodic status push to an IoT dashboard. No `url`, no telemetry.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RtcConfig {
    pub sync_on_start: bool,
    /// how often the system time is written back to the RTC, 0 never
    pub write_back_hours: u64,
    pub hwclock: String,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            sync_on_start: false,
            write_back_hours: 0,
            hwclock: "hwclock".to_string(),
        }
    }
}

/// chrono format strings used by the client.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub time_format: String,
    pub date_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            time_format: "%H:%M".to_string(),
            date_format: "%A, %-d %B %Y".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
