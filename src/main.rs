use std::{error::Error, path::PathBuf};

use chrono::Local;
use clap::{command, Parser, Subcommand};
use log::{info, warn};
use pi_clock::{
    alarm_edit::AlarmChanges,
    widgets, AlarmBuilder, Client,
};
use pi_clockd::{config::Config, Days, SettingsEdit};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// daemon config file, for the socket name and display formats
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default daemon config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// show the clock face (the default)
    Status,
    List,
    Next,
    Add {
        /// 7:30, 07:30, 7:30pm or "7:30 PM"
        time: String,
        /// all, weekdays, weekends, none or a list like mon,wed,fri
        #[clap(long, short, default_value = "all")]
        days: Days,
        #[clap(long, short)]
        label: Option<String>,
        #[clap(long, short, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
        /// sound name or path to a sound file
        #[clap(long, short)]
        sound: Option<String>,
    },
    Edit {
        /// alarm id or a unique prefix of it
        id: String,
        #[clap(long, short)]
        time: Option<String>,
        #[clap(long, short)]
        days: Option<Days>,
        #[clap(long, short)]
        label: Option<String>,
        #[clap(long, short, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
        /// sound name or path, `default` for the default sound
        #[clap(long, short)]
        sound: Option<String>,
    },
    Remove {
        id: String,
    },
    Enable {
        id: String,
    },
    Disable {
        id: String,
    },
    /// silence the ringing alarm
    Stop,
    Snooze,
    /// play the default sound, or stop it
    Test,
    /// show or change the global settings
    Settings {
        /// snooze length in minutes
        #[clap(long, value_parser = clap::value_parser!(u32).range(1..))]
        snooze: Option<u32>,
        #[clap(long)]
        brightness: Option<u32>,
        #[clap(long, value_parser = parse_on_off)]
        auto_dim: Option<bool>,
        /// brightness while dimmed
        #[clap(long)]
        night: Option<u32>,
        #[clap(long)]
        dim_start: Option<String>,
        #[clap(long)]
        dim_end: Option<String>,
    },
}

fn parse_on_off(s: &str) -> Result<bool, String> {
    match s {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(format!("expected on or off, got '{s}'")),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    // initilize the logger
    if let Err(e) = simple_file_logger::init_logger!("pi_clock") {
        eprintln!("couldn't initialize logger: {e:?}");
    }

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    if let Some(Command::Init { force }) = args.command {
        if force || !config_path.exists() {
            Config::new().save(&config_path)?;
            std::fs::create_dir_all(Config::sounds_path())?;
            println!("wrote {}", config_path.display());
            info!("wrote default config to {}", config_path.display());
        } else {
            println!(
                "{} already exists, use --force to overwrite it",
                config_path.display()
            );
        }
        return Ok(());
    }

    let config = Config::load_or_default(&config_path).unwrap_or_else(|e| {
        warn!("{e}");
        eprintln!("{e}\nusing the default config");
        Config::default()
    });
    let mut client = Client::connect(&config.socket_name)?;

    match args.command.unwrap_or(Command::Status) {
        Command::Init { .. } => {}
        Command::Status => {
            println!("{}", widgets::render_status(&client.status()?, &config.display));
        }
        Command::List => println!("{}", widgets::render_alarms(&client.alarms()?)),
        Command::Next => {
            let next = client.next_alarm()?;
            println!(
                "{}",
                widgets::render_next_alarm(next.as_ref(), Local::now().naive_local())
            );
        }
        Command::Add {
            time,
            days,
            label,
            volume,
            sound,
        } => {
            let mut builder = AlarmBuilder::new(&time)?
                .days(days)
                .name(label.unwrap_or_default())
                .sound(sound);
            if let Some(volume) = volume {
                builder = builder.volume(volume);
            }
            let alarm = client.add(builder.build()?)?;
            println!("added\n{}", widgets::render_alarm(&alarm));
        }
        Command::Edit {
            id,
            time,
            days,
            label,
            volume,
            sound,
        } => {
            let id = client.resolve(&id)?;
            let edits = AlarmChanges {
                time,
                days,
                label,
                volume,
                sound: sound.map(|sound| Some(sound).filter(|s| s != "default")),
                enabled: None,
            }
            .into_edits()?;
            if edits.is_empty() {
                println!("nothing to change");
            } else {
                println!("{}", widgets::render_alarm(&client.edit(id, edits)?));
            }
        }
        Command::Remove { id } => {
            let id = client.resolve(&id)?;
            println!("removed\n{}", widgets::render_alarm(&client.remove(id)?));
        }
        Command::Enable { id } => set_enabled(&mut client, &id, true)?,
        Command::Disable { id } => set_enabled(&mut client, &id, false)?,
        Command::Stop => {
            if client.stop()? {
                println!("alarm stopped");
            } else {
                println!("nothing is ringing");
            }
        }
        Command::Snooze => match client.snooze()? {
            Some(until) => println!("snoozed until {}", until.format("%H:%M")),
            None => println!("nothing to snooze"),
        },
        Command::Test => {
            if client.toggle_test()? {
                println!("playing test sound, run `pi_clock test` again to stop it");
            } else {
                println!("stopped");
            }
        }
        Command::Settings {
            snooze,
            brightness,
            auto_dim,
            night,
            dim_start,
            dim_end,
        } => {
            let mut edits = Vec::new();
            if let Some(minutes) = snooze {
                edits.push(SettingsEdit::SnoozeMinutes(minutes));
            }
            if let Some(brightness) = brightness {
                edits.push(SettingsEdit::Brightness(brightness));
            }
            if auto_dim.is_some() || night.is_some() || dim_start.is_some() || dim_end.is_some()
            {
                let mut dim = client.settings()?.auto_dim;
                if let Some(enabled) = auto_dim {
                    dim.enabled = enabled;
                }
                if let Some(night) = night {
                    dim.night = night;
                }
                if let Some(start) = dim_start {
                    dim.start = AlarmBuilder::new(&start)?.time()?;
                }
                if let Some(end) = dim_end {
                    dim.end = AlarmBuilder::new(&end)?.time()?;
                }
                edits.push(SettingsEdit::AutoDim(dim));
            }
            let settings = if edits.is_empty() {
                client.settings()?
            } else {
                client.set_settings(edits)?
            };
            println!("{}", widgets::render_settings(&settings));
        }
    }
    Ok(())
}

fn set_enabled(client: &mut Client, id: &str, enabled: bool) -> Result<(), Box<dyn Error>> {
    let id = client.resolve(id)?;
    let edits = AlarmChanges {
        enabled: Some(enabled),
        ..AlarmChanges::default()
    }
    .into_edits()?;
    println!("{}", widgets::render_alarm(&client.edit(id, edits)?));
    Ok(())
}
