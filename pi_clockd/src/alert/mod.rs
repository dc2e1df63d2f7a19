//! Devices that make the alarm audible.

use std::path::PathBuf;

use log::info;

use crate::{config::AlertConfig, error::Result};

mod buzzer;
mod command;
mod player;

pub use buzzer::{BuzzerAlert, Gpio, GPIO_ROOT};
pub use command::CommandAlert;
pub use player::PlayerAlert;

/// What to play. Backends without volume control or sound files ignore the
/// parts they cannot use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSound {
    pub path: Option<PathBuf>,
    pub volume: u8,
}

pub trait Alert: Send {
    /// Starts alerting, replacing whatever was already playing.
    fn start(&mut self, sound: &AlertSound) -> Result<()>;
    fn stop(&mut self);
    fn is_active(&mut self) -> bool;
}

/// Builds the configured backend.
pub fn build_alert(config: &AlertConfig) -> Result<Box<dyn Alert>> {
    Ok(match config {
        AlertConfig::Console => Box::new(ConsoleAlert::default()),
        AlertConfig::Buzzer { pin, on_ms, off_ms } => Box::new(BuzzerAlert::new(
            Gpio::export(*pin, GPIO_ROOT.as_ref())?,
            std::time::Duration::from_millis(*on_ms),
            std::time::Duration::from_millis(*off_ms),
        )),
        AlertConfig::Player => Box::new(PlayerAlert::spawn()?),
        AlertConfig::Command { program, args } => {
            Box::new(CommandAlert::new(program.clone(), args.clone()))
        }
    })
}

/// Logs instead of making noise.
#[derive(Debug, Default)]
pub struct ConsoleAlert {
    active: bool,
}

impl Alert for ConsoleAlert {
    fn start(&mut self, sound: &AlertSound) -> Result<()> {
        info!(
            "ALARM ringing (sound: {}, volume {}%)",
            sound
                .path
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string()),
            sound.volume
        );
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.active {
            info!("ALARM stopped");
        }
        self.active = false;
    }

    fn is_active(&mut self) -> bool {
        self.active
    }
}
