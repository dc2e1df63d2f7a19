use std::str::FromStr;

use chrono::NaiveTime;
use pi_clockd::{AlarmEdit, Days, Error, NewAlarm, Result};

use crate::{AlarmBuilder, TimeOfDay};

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "am" | "a.m." => Ok(Self::AM),
            "pm" | "p.m." => Ok(Self::PM),
            _ => Err(Error::InvalidTime(s.to_string())),
        }
    }
}

impl TimeOfDay {
    /// Hour on a 24 hour clock for `hour` (1-12) in this half of the day.
    #[must_use]
    pub const fn to_24h(self, hour: u8) -> u8 {
        match (self, hour) {
            (Self::AM, 12) => 0,
            (Self::AM, hour) | (Self::PM, hour @ 12) => hour,
            (Self::PM, hour) => hour + 12,
        }
    }
}

/// Splits `7:30`, `07:30`, `7:30pm`, `7:30 PM` or `7pm` into hour, minute and
/// the half of the day, if one was given.
pub fn parse_clock_time(s: &str) -> Result<(u8, u8, Option<TimeOfDay>)> {
    let invalid = || Error::InvalidTime(s.to_string());
    let trimmed = s.trim().to_lowercase();
    let (clock, time_of_day) = match trimmed
        .char_indices()
        .find(|(_, c)| c.is_ascii_alphabetic())
    {
        Some((split, _)) => (
            trimmed[..split].trim(),
            Some(trimmed[split..].parse::<TimeOfDay>().map_err(|_| invalid())?),
        ),
        None => (trimmed.as_str(), None),
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((hour, minute)) if minute.len() == 2 => (hour, minute),
        Some(_) => return Err(invalid()),
        // a bare hour is only clear with am/pm
        None if time_of_day.is_some() => (clock, "0"),
        None => return Err(invalid()),
    };
    // digits only, `u8::from_str` would also take a sign
    let number = |part: &str| {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        part.parse::<u8>().map_err(|_| invalid())
    };
    let hour = number(hour)?;
    let minute = number(minute)?;

    let hour_ok = if time_of_day.is_some() {
        (1..=12).contains(&hour)
    } else {
        hour < 24
    };
    if !hour_ok || minute >= 60 {
        return Err(invalid());
    }
    Ok((hour, minute, time_of_day))
}

impl AlarmBuilder {
    /// Starts an alarm at `time`, ringing every day at the default volume.
    pub fn new(time: &str) -> Result<Self> {
        let mut builder = Self::default();
        builder.set_time(time)?;
        Ok(builder)
    }

    pub fn set_time(&mut self, time: &str) -> Result<()> {
        let (hour, minute, time_of_day) = parse_clock_time(time)?;
        self.hour = hour;
        self.minute = minute;
        self.time_of_day = time_of_day;
        Ok(())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn days(mut self, days: Days) -> Self {
        self.days = days;
        self
    }

    #[must_use]
    pub fn sound(mut self, sound: Option<String>) -> Self {
        self.sound = sound;
        self
    }

    #[must_use]
    pub fn volume(mut self, volume: u8) -> Self {
        self.volume = volume.min(100);
        self
    }

    pub fn time(&self) -> Result<NaiveTime> {
        let hour = self
            .time_of_day
            .map_or(self.hour, |time_of_day| time_of_day.to_24h(self.hour));
        NaiveTime::from_hms_opt(u32::from(hour), u32::from(self.minute), 0).ok_or_else(|| {
            Error::InvalidTime(format!("{:02}:{:02}", self.hour, self.minute))
        })
    }

    pub fn build(self) -> Result<NewAlarm> {
        Ok(NewAlarm {
            time: self.time()?,
            days: self.days,
            label: self.name,
            volume: self.volume,
            sound: self.sound,
        })
    }
}

/// Changes to an existing alarm; unset fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmChanges {
    pub time: Option<String>,
    pub days: Option<Days>,
    pub label: Option<String>,
    pub volume: Option<u8>,
    /// `Some(None)` goes back to the default sound
    pub sound: Option<Option<String>>,
    pub enabled: Option<bool>,
}

impl AlarmChanges {
    pub fn into_edits(self) -> Result<Vec<AlarmEdit>> {
        let mut edits = Vec::new();
        if let Some(time) = self.time {
            edits.push(AlarmEdit::Time(AlarmBuilder::new(&time)?.time()?));
        }
        if let Some(days) = self.days {
            edits.push(AlarmEdit::Days(days));
        }
        if let Some(label) = self.label {
            edits.push(AlarmEdit::Label(label));
        }
        if let Some(volume) = self.volume {
            edits.push(AlarmEdit::Volume(volume.min(100)));
        }
        if let Some(sound) = self.sound {
            edits.push(AlarmEdit::Sound(sound));
        }
        if let Some(enabled) = self.enabled {
            edits.push(AlarmEdit::Enable(enabled));
        }
        Ok(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("7:30").unwrap(), (7, 30, None));
        assert_eq!(parse_clock_time("07:30").unwrap(), (7, 30, None));
        assert_eq!(
            parse_clock_time("7:30pm").unwrap(),
            (7, 30, Some(TimeOfDay::PM))
        );
        assert_eq!(
            parse_clock_time(" 7:30 PM ").unwrap(),
            (7, 30, Some(TimeOfDay::PM))
        );
        assert_eq!(parse_clock_time("7am").unwrap(), (7, 0, Some(TimeOfDay::AM)));
        assert_eq!(parse_clock_time("23:59").unwrap(), (23, 59, None));
    }

    #[test]
    fn test_parse_clock_time_rejects() {
        for bad in [
            "", "7", "24:00", "7:60", "13:00pm", "0:30am", "7:3", "7:30xm", "seven", "7:+5",
            "+7:30", "+7pm", ":30",
        ] {
            assert!(
                matches!(parse_clock_time(bad), Err(Error::InvalidTime(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_twelve_hour_conversion() {
        assert_eq!(AlarmBuilder::new("12:05am").unwrap().time().unwrap(), hm(0, 5));
        assert_eq!(AlarmBuilder::new("12:05pm").unwrap().time().unwrap(), hm(12, 5));
        assert_eq!(AlarmBuilder::new("1:00 PM").unwrap().time().unwrap(), hm(13, 0));
        assert_eq!(AlarmBuilder::new("11:45 am").unwrap().time().unwrap(), hm(11, 45));
    }

    #[test]
    fn test_build() {
        let alarm = AlarmBuilder::new("6:15")
            .unwrap()
            .name("gym")
            .days(Days::WEEKENDS)
            .volume(150)
            .sound(Some("rain".to_string()))
            .build()
            .unwrap();
        assert_eq!(
            alarm,
            NewAlarm {
                time: hm(6, 15),
                days: Days::WEEKENDS,
                label: "gym".to_string(),
                volume: 100,
                sound: Some("rain".to_string()),
            }
        );
    }

    #[test]
    fn test_changes_into_edits() {
        let changes = AlarmChanges {
            time: Some("8:00pm".to_string()),
            label: Some("evening".to_string()),
            sound: Some(None),
            enabled: Some(false),
            ..AlarmChanges::default()
        };
        assert_eq!(
            changes.into_edits().unwrap(),
            vec![
                AlarmEdit::Time(hm(20, 0)),
                AlarmEdit::Label("evening".to_string()),
                AlarmEdit::Sound(None),
                AlarmEdit::Enable(false),
            ]
        );
        assert!(AlarmChanges::default().into_edits().unwrap().is_empty());
        assert!(AlarmChanges {
            time: Some("25:00".to_string()),
            ..AlarmChanges::default()
        }
        .into_edits()
        .is_err());
    }
}
