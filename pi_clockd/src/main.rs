#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use clap::Parser;
use log::{error, info, warn};
use pi_clockd::{
    alert::{self, ConsoleAlert},
    backlight,
    clock::{self, AlarmClock},
    config::Config,
    rtc, server,
    store::AlarmStore,
    telemetry::{self, TelemetryClient},
    weather::{self, WeatherClient},
};

#[derive(Parser)]
#[command(author, version, about = "Alarm clock daemon", long_about = None)]
struct Args {
    /// config file to use instead of the default location
    #[clap(long, short)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<PathBuf>) -> Config {
    let path = path.unwrap_or_else(Config::config_path);
    let config = match Config::load_or_default(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}, using defaults");
            return Config::default();
        }
    };
    if let Err(e) = config.validate() {
        error!("{e}\nusing defaults");
        return Config::default();
    }
    info!("config loaded from {}", path.display());
    config
}

fn main() -> ExitCode {
    let args = Args::parse();
    // initilize the logger
    if let Err(e) = simple_file_logger::init_logger!("pi_clockd") {
        eprintln!("couldn't initialize logger: {e:?}");
    }

    let config = load_config(args.config);

    if config.rtc.sync_on_start {
        match rtc::hwclock_to_system(&config.rtc.hwclock) {
            Ok(()) => info!("system time set from RTC"),
            Err(e) => warn!("{e}"),
        }
    }

    let alert = alert::build_alert(&config.alert).unwrap_or_else(|e| {
        error!("couldn't set up {}: {e}, falling back to console", config.alert);
        Box::new(ConsoleAlert::default())
    });
    let clock = Arc::new(AlarmClock::new(
        AlarmStore::open(&config.alarms_path),
        alert,
        backlight::build_backlight(&config.backlight),
        config.clone(),
    ));

    // never sent on, the daemon runs until killed
    let (_shutdown_tx, shutdown) = crossbeam_channel::bounded::<()>(0);

    if let Err(e) = clock::spawn_poller(
        Arc::clone(&clock),
        Duration::from_secs(config.poll_interval_secs),
        shutdown.clone(),
    ) {
        error!("couldn't start the alarm poller: {e}");
        return ExitCode::FAILURE;
    }

    if config.weather.is_enabled() {
        let started = WeatherClient::new(config.weather.clone()).and_then(|client| {
            Ok(weather::spawn_refresher(
                Arc::clone(&clock),
                client,
                Duration::from_secs(config.weather.refresh_minutes * 60),
                shutdown.clone(),
            )?)
        });
        if let Err(e) = started {
            warn!("weather disabled: {e}");
        }
    }

    if let Some(url) = config.telemetry.url.clone() {
        let started =
            TelemetryClient::new(url, config.telemetry.token.clone()).and_then(|client| {
                Ok(telemetry::spawn_reporter(
                    Arc::clone(&clock),
                    client,
                    Duration::from_secs(config.telemetry.interval_secs),
                    shutdown.clone(),
                )?)
            });
        if let Err(e) = started {
            warn!("telemetry disabled: {e}");
        }
    }

    if config.rtc.write_back_hours > 0 {
        if let Err(e) = rtc::spawn_writer(
            config.rtc.hwclock.clone(),
            Duration::from_secs(config.rtc.write_back_hours * 3600),
            shutdown.clone(),
        ) {
            warn!("couldn't start the RTC writer: {e}");
        }
    }

    match server::run(&clock, &config.socket_name) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
