//! Periodic status push to a dashboard.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{Local, NaiveDateTime};
use crossbeam_channel::{select, Receiver};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{clock::AlarmClock, error::Result, Status};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TelemetryReport {
    pub ringing: bool,
    pub next_alarm: Option<NaiveDateTime>,
    pub alarm_count: usize,
    pub brightness: Option<u32>,
    pub temperature: Option<f64>,
}

impl From<&Status> for TelemetryReport {
    fn from(status: &Status) -> Self {
        Self {
            ringing: status.ringing.is_some(),
            next_alarm: status.next_alarm.as_ref().map(|next| next.at),
            alarm_count: status.alarm_count,
            brightness: status.brightness,
            temperature: status.weather.as_ref().map(|w| w.temperature),
        }
    }
}

#[derive(Debug)]
pub struct TelemetryClient {
    client: reqwest::blocking::Client,
    url: String,
    token: Option<String>,
}

impl TelemetryClient {
    pub fn new(url: String, token: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, url, token })
    }

    pub fn push(&self, report: &TelemetryReport) -> Result<()> {
        let mut request = self.client.post(&self.url).json(report);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send()?.error_for_status()?;
        debug!("telemetry sent to {}", self.url);
        Ok(())
    }
}

/// Pushes the clock's status every `interval` until `shutdown` fires or closes.
pub fn spawn_reporter(
    clock: Arc<AlarmClock>,
    client: TelemetryClient,
    interval: Duration,
    shutdown: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("telemetry".to_string())
        .spawn(move || {
            let ticker = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let report = TelemetryReport::from(&clock.status(Local::now().naive_local()));
                        if let Err(e) = client.push(&report) {
                            warn!("telemetry push failed: {e}");
                        }
                    }
                    recv(shutdown) -> _ => break,
                }
            }
        })
}
