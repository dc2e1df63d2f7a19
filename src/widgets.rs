use std::fmt::Write;

use chrono::{NaiveDateTime, TimeDelta};
use pi_clockd::{
    config::DisplayConfig, weather::Weather, Alarm, NextAlarm, Ringing, Settings, Status,
};

/// Formats `time` with a user supplied chrono format, falling back to
/// `fallback` when the format string is invalid.
fn format_or(time: &NaiveDateTime, format: &str, fallback: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", time.format(format)).is_err() {
        out.clear();
        // fallback formats are fixed and valid
        let _ = write!(out, "{}", time.format(fallback));
    }
    out
}

/// `in 2 d 23 h`, `in 5 h 10 min`, `in 3 min`, `now`.
#[must_use]
pub fn countdown(from: NaiveDateTime, to: NaiveDateTime) -> String {
    let delta = to - from;
    if delta <= TimeDelta::zero() {
        return "now".to_string();
    }
    // round up so an alarm 30 s away is not shown as 0 min
    let minutes = (delta.num_seconds() + 59) / 60;
    let (days, hours, minutes) = (minutes / 1440, minutes / 60 % 24, minutes % 60);
    match (days, hours) {
        (0, 0) => format!("in {minutes} min"),
        (0, _) => format!("in {hours} h {minutes} min"),
        _ => format!("in {days} d {hours} h"),
    }
}

#[must_use]
pub fn render_next_alarm(next: Option<&NextAlarm>, now: NaiveDateTime) -> String {
    next.map_or_else(
        || "No alarms set".to_string(),
        |next| {
            let name = if next.label.is_empty() {
                "alarm".to_string()
            } else {
                next.label.clone()
            };
            format!(
                "Next: {name} {} ({})",
                next.at.format("%a %H:%M"),
                countdown(now, next.at)
            )
        },
    )
}

/// What the clock face shows: time, date, weather, alert state and next alarm.
#[must_use]
pub fn render_status(status: &Status, display: &DisplayConfig) -> String {
    let mut lines = vec![
        format_or(&status.now, &display.time_format, "%H:%M"),
        format_or(&status.now, &display.date_format, "%A, %-d %B %Y"),
        Weather::display_line(status.weather.as_ref()),
    ];
    match &status.ringing {
        Some(Ringing::Alarm { label, .. }) => lines.push(format!("⏰ {label} is ringing")),
        Some(Ringing::Test) => lines.push("🔔 test sound playing".to_string()),
        None => {}
    }
    if let Some(until) = status.snoozed_until {
        lines.push(format!(
            "💤 snoozed until {} ({})",
            until.format("%H:%M"),
            countdown(status.now, until)
        ));
    }
    lines.push(render_next_alarm(status.next_alarm.as_ref(), status.now));
    if let Some(brightness) = status.brightness {
        lines.push(format!("Brightness {brightness}"));
    }
    lines.join("\n")
}

/// One alarm per line: short id, on/off, time, days, label, volume and sound.
#[must_use]
pub fn render_alarms(alarms: &[Alarm]) -> String {
    if alarms.is_empty() {
        return "No alarms".to_string();
    }
    alarms
        .iter()
        .map(render_alarm)
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn render_alarm(alarm: &Alarm) -> String {
    let id = alarm.id.simple().to_string();
    format!(
        "{}  [{}] {}  {:<20} {:<16} {:>3}%  {}",
        &id[..8],
        if alarm.enabled { "on " } else { "off" },
        alarm.human_time(),
        alarm.human_days(),
        if alarm.label.is_empty() { "-" } else { alarm.label.as_str() },
        alarm.volume,
        alarm.sound.as_deref().unwrap_or("default sound"),
    )
    .trim_end()
    .to_string()
}

#[must_use]
pub fn render_settings(settings: &Settings) -> String {
    let auto_dim = &settings.auto_dim;
    format!(
        "Snooze: {} min\nBrightness: {}\nAuto-dim: {} (night {} from {} to {})",
        settings.snooze_minutes,
        settings.brightness,
        if auto_dim.enabled { "on" } else { "off" },
        auto_dim.night,
        auto_dim.start.format("%H:%M"),
        auto_dim.end.format("%H:%M"),
    )
}
