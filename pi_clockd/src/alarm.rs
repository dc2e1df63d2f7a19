use std::{fmt, ops::AddAssign, str::FromStr};

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default alarm volume in percent.
pub const DEFAULT_VOLUME: u8 = 70;

/// Monday first, matching the on-disk day indices.
const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const SHORT_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[inline]
#[must_use]
pub const fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

/// Reads a volume, capping it at 100 like [`AlarmEdit::Volume`].
fn volume_percent<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    u8::deserialize(deserializer).map(|volume| volume.min(100))
}

/// A repeating alarm.
/// Rings on every weekday in `days` at `time`, as long as it is enabled.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Alarm {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default)]
    pub days: Days,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_volume", deserialize_with = "volume_percent")]
    pub volume: u8,
    /// sound name from the sound table or a path, `None` uses the default sound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default = "always_true")]
    pub enabled: bool,
}

impl Alarm {
    #[must_use]
    pub fn new(time: NaiveTime, days: Days) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: truncate_to_minute(time),
            days,
            label: String::new(),
            volume: DEFAULT_VOLUME,
            sound: None,
            enabled: true,
        }
    }

    /// Whether the alarm matches `now` at minute resolution.
    /// Does not remember previous firings, see [`crate::matcher::AlarmMatcher`].
    #[must_use]
    pub fn matches(&self, now: &NaiveDateTime) -> bool {
        self.enabled
            && self.days.contains(now.weekday())
            && now.hour() == self.time.hour()
            && now.minute() == self.time.minute()
    }

    #[must_use]
    pub fn human_time(&self) -> String {
        self.time.format("%H:%M").to_string()
    }

    #[must_use]
    pub fn human_days(&self) -> String {
        self.days.to_string()
    }

    /// Label for logs and the client, falls back to the time.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.label.is_empty() {
            format!("alarm {}", self.human_time())
        } else {
            self.label.clone()
        }
    }
}

impl From<NewAlarm> for Alarm {
    fn from(new: NewAlarm) -> Self {
        Self {
            label: new.label,
            volume: new.volume.min(100),
            sound: new.sound,
            ..Self::new(new.time, new.days)
        }
    }
}

/// An alarm as sent by the client, before the daemon assigns it an id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewAlarm {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub days: Days,
    pub label: String,
    pub volume: u8,
    pub sound: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum AlarmEdit {
    Time(#[serde(with = "hhmm")] NaiveTime),
    Days(Days),
    Label(String),
    Sound(Option<String>),
    Volume(u8),
    Enable(bool),
}

impl AddAssign<AlarmEdit> for Alarm {
    /// edits keep the id so the alarm stays addressable
    fn add_assign(&mut self, edit: AlarmEdit) {
        match edit {
            AlarmEdit::Time(time) => self.time = truncate_to_minute(time),
            AlarmEdit::Days(days) => self.days = days,
            AlarmEdit::Label(label) => self.label = label,
            AlarmEdit::Sound(sound) => self.sound = sound,
            AlarmEdit::Volume(volume) => self.volume = volume.min(100),
            AlarmEdit::Enable(enabled) => self.enabled = enabled,
        }
    }
}

/// Set of weekdays an alarm repeats on, one bit per day starting at Monday.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Days(u8);

impl Days {
    pub const NONE: Self = Self(0);
    pub const WEEKDAYS: Self = Self(0x1F);
    pub const WEEKENDS: Self = Self(0x60);
    pub const ALL: Self = Self(0x7F);

    /// Builds a set from Monday-based indices (0 = Monday, 6 = Sunday).
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Result<Self> {
        let mut days = Self::NONE;
        for index in indices {
            let day = WEEKDAYS
                .get(usize::from(index))
                .ok_or_else(|| Error::InvalidDays(index.to_string()))?;
            days.insert(*day);
        }
        Ok(days)
    }

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        WEEKDAYS.into_iter().filter(move |day| self.contains(*day))
    }

    pub fn indices(self) -> impl Iterator<Item = u8> {
        // num_days_from_monday is always below 7
        self.iter().map(|day| day.num_days_from_monday() as u8)
    }
}

impl fmt::Display for Days {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ALL => f.write_str("Every day"),
            Self::WEEKDAYS => f.write_str("Weekdays"),
            Self::WEEKENDS => f.write_str("Weekends"),
            Self::NONE => f.write_str("Never"),
            days => {
                let names: Vec<&str> = days
                    .iter()
                    .map(|day| SHORT_NAMES[day.num_days_from_monday() as usize])
                    .collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

impl FromStr for Days {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "all" | "every day" | "everyday" | "daily" => return Ok(Self::ALL),
            "weekdays" => return Ok(Self::WEEKDAYS),
            "weekends" => return Ok(Self::WEEKENDS),
            "none" | "never" | "" => return Ok(Self::NONE),
            _ => {}
        }
        let mut days = Self::NONE;
        for token in normalized.split(',').map(str::trim) {
            let day = match token.parse::<u8>() {
                Ok(index) => WEEKDAYS.get(usize::from(index)).copied(),
                Err(_) => token.parse::<Weekday>().ok(),
            };
            days.insert(day.ok_or_else(|| Error::InvalidDays(s.to_string()))?);
        }
        Ok(days)
    }
}

impl Serialize for Days {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.indices())
    }
}

impl<'de> Deserialize<'de> for Days {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let indices = Vec::<u8>::deserialize(deserializer)?;
        Self::from_indices(indices).map_err(de::Error::custom)
    }
}

/// Parses `HH:MM` (a single hour digit is accepted).
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| Error::InvalidTime(s.to_string()))
}

#[must_use]
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Serde adapter storing a [`NaiveTime`] as `"HH:MM"`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_time(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn seven() -> NaiveTime {
        NaiveTime::from_hms_opt(7, 0, 0).unwrap()
    }

    #[test]
    fn test_matches_weekday_and_minute() {
        let alarm = Alarm::new(seven(), Days::WEEKDAYS);
        // 2026-10-12 is a Monday
        assert!(alarm.matches(&at(2026, 10, 12, 7, 0, 0)));
        assert!(alarm.matches(&at(2026, 10, 12, 7, 0, 59)));
        assert!(!alarm.matches(&at(2026, 10, 12, 7, 1, 0)));
        assert!(!alarm.matches(&at(2026, 10, 12, 19, 0, 0)));
    }

    #[test]
    fn test_does_not_match_on_saturday() {
        let alarm = Alarm::new(seven(), Days::WEEKDAYS);
        // 2026-10-17 is a Saturday
        assert!(!alarm.matches(&at(2026, 10, 17, 7, 0, 0)));
    }

    #[test]
    fn test_disabled_never_matches() {
        let mut alarm = Alarm::new(seven(), Days::ALL);
        alarm += AlarmEdit::Enable(false);
        assert!(!alarm.matches(&at(2026, 10, 12, 7, 0, 0)));
    }

    #[test]
    fn test_no_days_never_matches() {
        let alarm = Alarm::new(seven(), Days::NONE);
        assert!(!alarm.matches(&at(2026, 10, 12, 7, 0, 0)));
    }

    #[test]
    fn test_days_parse() {
        assert_eq!("weekdays".parse::<Days>().unwrap(), Days::WEEKDAYS);
        assert_eq!("All".parse::<Days>().unwrap(), Days::ALL);
        let days: Days = "mon, wed,Friday".parse().unwrap();
        assert_eq!(days.indices().collect::<Vec<_>>(), vec![0, 2, 4]);
        let days: Days = "5,6".parse().unwrap();
        assert_eq!(days, Days::WEEKENDS);
        assert!("mon,funday".parse::<Days>().is_err());
        assert!("7".parse::<Days>().is_err());
    }

    #[test]
    fn test_days_display() {
        assert_eq!(Days::ALL.to_string(), "Every day");
        assert_eq!(Days::WEEKDAYS.to_string(), "Weekdays");
        assert_eq!(Days::NONE.to_string(), "Never");
        let days = Days::from_indices([0, 2, 6]).unwrap();
        assert_eq!(days.to_string(), "Mon, Wed, Sun");
    }

    #[test]
    fn test_days_json_rejects_out_of_range() {
        assert!(serde_json::from_str::<Days>("[0, 7]").is_err());
        let days: Days = serde_json::from_str("[4, 0, 0]").unwrap();
        assert_eq!(serde_json::to_string(&days).unwrap(), "[0,4]");
    }

    #[test]
    fn test_alarm_json_defaults() {
        let alarm: Alarm = serde_json::from_str(r#"{"time": "6:45"}"#).unwrap();
        assert_eq!(alarm.human_time(), "06:45");
        assert!(alarm.enabled);
        assert!(alarm.days.is_empty());
        assert_eq!(alarm.volume, DEFAULT_VOLUME);
        assert_eq!(alarm.sound, None);
        assert_eq!(alarm.display_name(), "alarm 06:45");
    }

    #[test]
    fn test_alarm_json_caps_volume() {
        let alarm: Alarm = serde_json::from_str(r#"{"time": "6:45", "volume": 250}"#).unwrap();
        assert_eq!(alarm.volume, 100);
    }

    #[test]
    fn test_alarm_json_shape() {
        let mut alarm = Alarm::new(NaiveTime::from_hms_opt(7, 30, 12).unwrap(), Days::WEEKENDS);
        alarm += AlarmEdit::Label("gym".to_string());
        let value = serde_json::to_value(&alarm).unwrap();
        assert_eq!(value["time"], "07:30");
        assert_eq!(value["days"], serde_json::json!([5, 6]));
        assert_eq!(value["label"], "gym");
        assert!(value.get("sound").is_none());
    }

    #[test]
    fn test_edit_clamps_volume_and_keeps_id() {
        let mut alarm = Alarm::new(seven(), Days::ALL);
        let id = alarm.id;
        alarm += AlarmEdit::Volume(250);
        alarm += AlarmEdit::Time(NaiveTime::from_hms_opt(8, 15, 0).unwrap());
        assert_eq!(alarm.volume, 100);
        assert_eq!(alarm.human_time(), "08:15");
        assert_eq!(alarm.id, id);
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("seven").is_err());
        assert_eq!(parse_time(" 23:59 ").unwrap().minute(), 59);
    }
}
