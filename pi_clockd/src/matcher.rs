//! Which alarms fire now, and which one rings next.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alarm::Alarm;

/// How many days ahead [`next_alarm`] looks. Seven so that an alarm set only
/// for today's weekday, earlier than now, is found a week later.
const HORIZON_DAYS: i64 = 7;

/// Remembers the minute each alarm last fired, so polling several times a
/// minute still fires an alarm once.
#[derive(Debug, Default)]
pub struct AlarmMatcher {
    last_fired: HashMap<Uuid, NaiveDateTime>,
}

impl AlarmMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Alarms that start firing at `now`, in list order.
    pub fn due<'a>(&mut self, now: NaiveDateTime, alarms: &'a [Alarm]) -> Vec<&'a Alarm> {
        let minute = minute_key(now);
        self.last_fired
            .retain(|id, _| alarms.iter().any(|alarm| alarm.id == *id));

        alarms
            .iter()
            .filter(|alarm| alarm.matches(&now))
            .filter(|alarm| {
                let fired = self.last_fired.get(&alarm.id) == Some(&minute);
                if !fired {
                    self.last_fired.insert(alarm.id, minute);
                }
                !fired
            })
            .collect()
    }
}

/// `now` truncated to the start of its minute.
#[must_use]
pub fn minute_key(now: NaiveDateTime) -> NaiveDateTime {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NextAlarm {
    pub alarm_id: Uuid,
    pub label: String,
    pub at: NaiveDateTime,
}

/// The enabled alarm that rings soonest strictly after `now`.
///
/// Days are scanned from today onwards; within a day the earliest time wins and
/// equal times go to the alarm listed first.
#[must_use]
pub fn next_alarm(now: NaiveDateTime, alarms: &[Alarm]) -> Option<NextAlarm> {
    for offset in 0..=HORIZON_DAYS {
        let date = now.date() + TimeDelta::days(offset);
        let weekday = date.weekday();
        let mut best: Option<(NaiveDateTime, &Alarm)> = None;
        for alarm in alarms
            .iter()
            .filter(|alarm| alarm.enabled && alarm.days.contains(weekday))
        {
            let at = date.and_time(alarm.time);
            if at > now && best.map_or(true, |(best_at, _)| at < best_at) {
                best = Some((at, alarm));
            }
        }
        if let Some((at, alarm)) = best {
            return Some(NextAlarm {
                alarm_id: alarm.id,
                label: alarm.display_name(),
                at,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmEdit, Days};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        // October 2026: the 12th is a Monday, the 17th a Saturday
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn alarm(h: u32, m: u32, days: Days) -> Alarm {
        Alarm::new(NaiveTime::from_hms_opt(h, m, 0).unwrap(), days)
    }

    #[test]
    fn test_fires_once_per_minute() {
        let alarms = vec![alarm(7, 0, Days::WEEKDAYS)];
        let mut matcher = AlarmMatcher::new();

        assert_eq!(matcher.due(at(12, 7, 0, 0), &alarms).len(), 1);
        assert!(matcher.due(at(12, 7, 0, 1), &alarms).is_empty());
        assert!(matcher.due(at(12, 7, 0, 30), &alarms).is_empty());
        assert!(matcher.due(at(12, 7, 0, 59), &alarms).is_empty());
        assert!(matcher.due(at(12, 7, 1, 0), &alarms).is_empty());
        // next day, same time
        assert_eq!(matcher.due(at(13, 7, 0, 15), &alarms).len(), 1);
    }

    #[test]
    fn test_saturday_does_not_fire() {
        let alarms = vec![alarm(7, 0, Days::WEEKDAYS)];
        let mut matcher = AlarmMatcher::new();
        assert!(matcher.due(at(17, 7, 0, 0), &alarms).is_empty());
    }

    #[test]
    fn test_due_keeps_list_order_and_skips_disabled() {
        let mut off = alarm(6, 0, Days::ALL);
        off += AlarmEdit::Enable(false);
        let first = alarm(6, 0, Days::ALL);
        let second = alarm(6, 0, Days::ALL);
        let alarms = vec![off, first.clone(), second.clone()];

        let due = AlarmMatcher::new().due(at(14, 6, 0, 10), &alarms);
        let ids: Vec<Uuid> = due.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_forgets_removed_alarms() {
        let alarms = vec![alarm(7, 0, Days::ALL)];
        let mut matcher = AlarmMatcher::new();
        matcher.due(at(12, 7, 0, 0), &alarms);
        matcher.due(at(12, 7, 0, 5), &[]);
        assert!(matcher.last_fired.is_empty());
    }

    #[test]
    fn test_next_alarm_saturday_to_monday() {
        let weekday = alarm(7, 0, Days::WEEKDAYS);
        let next = next_alarm(at(17, 8, 0, 0), &[weekday.clone()]).unwrap();
        assert_eq!(next.alarm_id, weekday.id);
        assert_eq!(next.at, at(19, 7, 0, 0));
        assert_eq!(next.at.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_next_alarm_later_today() {
        let early = alarm(6, 0, Days::ALL);
        let late = alarm(21, 0, Days::ALL);
        let next = next_alarm(at(14, 12, 0, 0), &[early, late.clone()]).unwrap();
        assert_eq!(next.alarm_id, late.id);
        assert_eq!(next.at, at(14, 21, 0, 0));
    }

    #[test]
    fn test_next_alarm_is_strictly_after_now() {
        let seven = alarm(7, 0, Days::ALL);
        let next = next_alarm(at(14, 7, 0, 0), &[seven]).unwrap();
        assert_eq!(next.at, at(15, 7, 0, 0));
    }

    #[test]
    fn test_next_alarm_same_weekday_next_week() {
        // only on Wednesdays, and today's already passed
        let wednesday = alarm(6, 0, Days::from_indices([2]).unwrap());
        let next = next_alarm(at(14, 9, 0, 0), &[wednesday]).unwrap();
        assert_eq!(next.at, at(21, 6, 0, 0));
    }

    #[test]
    fn test_next_alarm_tie_goes_to_first() {
        let first = alarm(8, 0, Days::ALL);
        let second = alarm(8, 0, Days::ALL);
        let next = next_alarm(at(14, 7, 0, 0), &[first.clone(), second]).unwrap();
        assert_eq!(next.alarm_id, first.id);
    }

    #[test]
    fn test_next_alarm_none_when_nothing_enabled() {
        let mut off = alarm(8, 0, Days::ALL);
        off += AlarmEdit::Enable(false);
        assert_eq!(next_alarm(at(14, 7, 0, 0), &[off]), None);
        assert_eq!(next_alarm(at(14, 7, 0, 0), &[alarm(8, 0, Days::NONE)]), None);
        assert_eq!(next_alarm(at(14, 7, 0, 0), &[]), None);
    }
}
