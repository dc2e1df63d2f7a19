//! The alarm clock shared by the poller, the socket server and the background
//! collaborators.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use crossbeam_channel::{select, Receiver};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    alarm::{Alarm, AlarmEdit, NewAlarm, DEFAULT_VOLUME},
    alert::{Alert, AlertSound},
    backlight::Backlight,
    config::Config,
    error::Result,
    matcher::{self, AlarmMatcher, NextAlarm},
    settings::{Settings, SettingsEdit},
    store::AlarmStore,
    weather::Weather,
};

/// What is making noise right now.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Ringing {
    Alarm { id: Uuid, label: String },
    /// started with `toggle_test`
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snooze {
    alarm_id: Uuid,
    at: NaiveDateTime,
}

/// Snapshot for clients and telemetry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Status {
    pub now: NaiveDateTime,
    pub ringing: Option<Ringing>,
    pub snoozed_until: Option<NaiveDateTime>,
    pub next_alarm: Option<NextAlarm>,
    pub alarm_count: usize,
    /// last value written to the display, `None` before the first write
    pub brightness: Option<u32>,
    pub weather: Option<Weather>,
}

#[derive(Debug)]
struct ClockState {
    store: AlarmStore,
    matcher: AlarmMatcher,
    ringing: Option<Ringing>,
    snooze: Option<Snooze>,
    target_brightness: Option<u32>,
    applied_brightness: Option<u32>,
}

/// Locks are always taken in field order: `state`, then `alert`, then
/// `backlight`.
pub struct AlarmClock {
    state: Mutex<ClockState>,
    alert: Mutex<Box<dyn Alert>>,
    backlight: Mutex<Box<dyn Backlight>>,
    weather: Mutex<Option<Weather>>,
    config: Config,
}

impl std::fmt::Debug for AlarmClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmClock")
            .field("state", &self.state)
            .field("alert", &self.config.alert)
            .finish_non_exhaustive()
    }
}

/// A panicking holder does not leave the clock state half-written, so a
/// poisoned lock is still usable.
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AlarmClock {
    #[must_use]
    pub fn new(
        store: AlarmStore,
        alert: Box<dyn Alert>,
        backlight: Box<dyn Backlight>,
        config: Config,
    ) -> Self {
        Self {
            state: Mutex::new(ClockState {
                store,
                matcher: AlarmMatcher::new(),
                ringing: None,
                snooze: None,
                target_brightness: None,
                applied_brightness: None,
            }),
            alert: Mutex::new(alert),
            backlight: Mutex::new(backlight),
            weather: Mutex::new(None),
            config,
        }
    }

    /// One poll: fires due alarms, re-fires an expired snooze and follows the
    /// auto-dim schedule.
    pub fn tick(&self, now: NaiveDateTime) {
        let mut state = lock(&self.state);

        if state.ringing.is_some() && !lock(&self.alert).is_active() {
            info!("alert finished on its own");
            state.ringing = None;
        }

        let due: Vec<Alarm> = {
            let ClockState { store, matcher, .. } = &mut *state;
            matcher
                .due(now, store.alarms())
                .into_iter()
                .cloned()
                .collect()
        };
        for alarm in &due {
            self.ring(&mut state, alarm);
        }

        if let Some(snooze) = state.snooze.filter(|snooze| snooze.at <= now) {
            state.snooze = None;
            let alarm = state.store.get(snooze.alarm_id).cloned();
            match alarm {
                Some(alarm) => {
                    info!("snooze over for {}", alarm.display_name());
                    self.ring(&mut state, &alarm);
                }
                None => debug!("snoozed alarm {} no longer exists", snooze.alarm_id),
            }
        }

        self.apply_brightness(&mut state, now.time());
    }

    /// Starts the alert for `alarm` unless another alarm is already ringing.
    /// A test sound is replaced.
    fn ring(&self, state: &mut ClockState, alarm: &Alarm) {
        let mut alert = lock(&self.alert);
        match &state.ringing {
            Some(Ringing::Alarm { label, .. }) => {
                info!(
                    "{} is due but {label} is still ringing, skipping it",
                    alarm.display_name()
                );
                return;
            }
            Some(Ringing::Test) => {
                info!("{} takes over from the test sound", alarm.display_name());
                alert.stop();
                state.ringing = None;
            }
            None => {}
        }
        let sound = AlertSound {
            path: self.config.resolve_sound(alarm.sound.as_deref()),
            volume: alarm.volume,
        };
        match alert.start(&sound) {
            Ok(()) => {
                info!("{} ringing", alarm.display_name());
                state.ringing = Some(Ringing::Alarm {
                    id: alarm.id,
                    label: alarm.display_name(),
                });
            }
            Err(e) => error!("couldn't sound {}: {e}", alarm.display_name()),
        }
    }

    fn apply_brightness(&self, state: &mut ClockState, time: NaiveTime) {
        let target = state.store.settings().target_brightness(time);
        if state.target_brightness == Some(target) {
            return;
        }
        // a failed write is not retried until the target changes again
        state.target_brightness = Some(target);
        match lock(&self.backlight).set(target) {
            Ok(applied) => {
                info!("brightness {applied}");
                state.applied_brightness = Some(applied);
            }
            Err(e) => warn!("couldn't set brightness: {e}"),
        }
    }

    /// Silences the alert and drops any pending snooze. Returns whether
    /// anything was ringing.
    pub fn stop(&self) -> bool {
        let mut state = lock(&self.state);
        lock(&self.alert).stop();
        if let Some(snooze) = state.snooze.take() {
            info!("snooze until {} cancelled", snooze.at);
        }
        let was_ringing = state.ringing.take().is_some();
        if was_ringing {
            info!("alarm stopped");
        }
        was_ringing
    }

    /// Silences the ringing alarm and schedules it again after the snooze
    /// period. Returns when it rings again; a test ring is only stopped.
    pub fn snooze(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut state = lock(&self.state);
        match state.ringing.take() {
            Some(Ringing::Alarm { id, label }) => {
                lock(&self.alert).stop();
                let minutes = state.store.settings().snooze_minutes;
                let at = now + TimeDelta::minutes(i64::from(minutes));
                info!("{label} snoozed until {at}");
                state.snooze = Some(Snooze { alarm_id: id, at });
                Some(at)
            }
            Some(Ringing::Test) => {
                lock(&self.alert).stop();
                None
            }
            None => None,
        }
    }

    /// Plays the default sound, or stops whatever is playing. Returns whether
    /// the test is now running.
    pub fn toggle_test(&self) -> Result<bool> {
        let mut state = lock(&self.state);
        let mut alert = lock(&self.alert);
        if state.ringing.is_some() || alert.is_active() {
            alert.stop();
            state.ringing = None;
            return Ok(false);
        }
        alert.start(&AlertSound {
            path: self.config.resolve_sound(None),
            volume: DEFAULT_VOLUME,
        })?;
        info!("test alarm started");
        state.ringing = Some(Ringing::Test);
        Ok(true)
    }

    #[must_use]
    pub fn alarms(&self) -> Vec<Alarm> {
        lock(&self.state).store.alarms().to_vec()
    }

    pub fn add_alarm(&self, alarm: NewAlarm) -> Result<Alarm> {
        let alarm = lock(&self.state).store.add(alarm.into())?;
        info!("added {} ({})", alarm.display_name(), alarm.human_days());
        Ok(alarm)
    }

    /// Disabling an alarm also drops its pending snooze.
    pub fn edit_alarm(&self, id: Uuid, edits: Vec<AlarmEdit>) -> Result<Alarm> {
        let mut state = lock(&self.state);
        let alarm = state.store.edit(id, edits)?;
        if !alarm.enabled && state.snooze.is_some_and(|snooze| snooze.alarm_id == id) {
            state.snooze = None;
        }
        info!("edited {}", alarm.display_name());
        Ok(alarm)
    }

    /// Removing the ringing or snoozed alarm silences it.
    pub fn remove_alarm(&self, id: Uuid) -> Result<Alarm> {
        let mut state = lock(&self.state);
        let alarm = state.store.remove(id)?;
        if matches!(&state.ringing, Some(Ringing::Alarm { id: ringing, .. }) if *ringing == id) {
            lock(&self.alert).stop();
            state.ringing = None;
        }
        if state.snooze.is_some_and(|snooze| snooze.alarm_id == id) {
            state.snooze = None;
        }
        info!("removed {}", alarm.display_name());
        Ok(alarm)
    }

    #[must_use]
    pub fn next_alarm(&self, now: NaiveDateTime) -> Option<NextAlarm> {
        matcher::next_alarm(now, lock(&self.state).store.alarms())
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        lock(&self.state).store.settings().clone()
    }

    /// Persists the edits and applies the resulting brightness for `now`.
    pub fn update_settings(&self, edits: Vec<SettingsEdit>, now: NaiveDateTime) -> Result<Settings> {
        let mut state = lock(&self.state);
        let settings = state.store.update_settings(edits)?;
        self.apply_brightness(&mut state, now.time());
        Ok(settings)
    }

    #[must_use]
    pub fn status(&self, now: NaiveDateTime) -> Status {
        let state = lock(&self.state);
        Status {
            now,
            ringing: state.ringing.clone(),
            snoozed_until: state.snooze.map(|snooze| snooze.at),
            next_alarm: matcher::next_alarm(now, state.store.alarms()),
            alarm_count: state.store.alarms().len(),
            brightness: state.applied_brightness,
            weather: lock(&self.weather).clone(),
        }
    }

    pub fn set_weather(&self, weather: Option<Weather>) {
        *lock(&self.weather) = weather;
    }

    #[must_use]
    pub fn is_ringing(&self) -> bool {
        lock(&self.state).ringing.is_some()
    }
}

/// Calls [`AlarmClock::tick`] with local time now and then every `interval`
/// until `shutdown` fires or closes.
pub fn spawn_poller(
    clock: Arc<AlarmClock>,
    interval: Duration,
    shutdown: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("poller".to_string())
        .spawn(move || {
            clock.tick(Local::now().naive_local());
            let ticker = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => clock.tick(Local::now().naive_local()),
                    recv(shutdown) -> _ => break,
                }
            }
            debug!("poller stopped");
        })
}
