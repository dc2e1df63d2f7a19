//! Global settings stored next to the alarms.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::alarm::hhmm;

pub const DEFAULT_SNOOZE_MINUTES: u32 = 10;
pub const DEFAULT_BRIGHTNESS: u32 = 180;
pub const DEFAULT_NIGHT_BRIGHTNESS: u32 = 40;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "snooze_minutes")]
    pub snooze_minutes: u32,
    pub brightness: u32,
    pub auto_dim: AutoDim,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            brightness: DEFAULT_BRIGHTNESS,
            auto_dim: AutoDim::default(),
        }
    }
}

/// A zero snooze would re-ring on the next poll, so it reads as one minute.
fn snooze_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    u32::deserialize(deserializer).map(|minutes| minutes.max(1))
}

impl Settings {
    /// Brightness the display should have at `time`.
    #[must_use]
    pub fn target_brightness(&self, time: NaiveTime) -> u32 {
        if self.auto_dim.enabled && self.auto_dim.is_night(time) {
            self.auto_dim.night
        } else {
            self.brightness
        }
    }
}

impl std::ops::AddAssign<SettingsEdit> for Settings {
    fn add_assign(&mut self, edit: SettingsEdit) {
        match edit {
            SettingsEdit::SnoozeMinutes(minutes) => self.snooze_minutes = minutes.max(1),
            SettingsEdit::Brightness(brightness) => self.brightness = brightness,
            SettingsEdit::AutoDim(auto_dim) => self.auto_dim = auto_dim,
        }
    }
}

/// Night window during which the display is dimmed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AutoDim {
    pub enabled: bool,
    pub night: u32,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl Default for AutoDim {
    fn default() -> Self {
        Self {
            enabled: false,
            night: DEFAULT_NIGHT_BRIGHTNESS,
            start: NaiveTime::from_hms_opt(22, 30, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(6, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl AutoDim {
    /// `start <= time < end`, wrapping past midnight when `start > end`.
    #[must_use]
    pub fn is_night(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum SettingsEdit {
    SnoozeMinutes(u32),
    Brightness(u32),
    AutoDim(AutoDim),
}
