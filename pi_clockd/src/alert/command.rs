use std::process::{Child, Command, Stdio};

use log::{info, warn};

use super::{Alert, AlertSound};
use crate::error::{Error, Result};

/// Runs an external player such as `mpg123` for as long as the alarm rings.
#[derive(Debug)]
pub struct CommandAlert {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl CommandAlert {
    #[must_use]
    pub const fn new(program: String, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            child: None,
        }
    }

    fn expand_args(&self, sound: &AlertSound) -> Vec<String> {
        let file = sound
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let volume = sound.volume.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{file}", &file).replace("{volume}", &volume))
            .collect()
    }
}

impl Alert for CommandAlert {
    fn start(&mut self, sound: &AlertSound) -> Result<()> {
        self.stop();
        let args = self.expand_args(sound);
        info!("running {} {}", self.program, args.join(" "));
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Alert(format!("couldn't run {}: {e}", self.program)))?;
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            // already exited is fine
            let _ = child.kill();
            if let Err(e) = child.wait() {
                warn!("couldn't reap {}: {e}", self.program);
            }
        }
    }

    fn is_active(&mut self) -> bool {
        let running = self
            .child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)));
        if !running {
            self.stop();
        }
        running
    }
}

impl Drop for CommandAlert {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sound() -> AlertSound {
        AlertSound {
            path: Some(PathBuf::from("/sounds/ring.mp3")),
            volume: 65,
        }
    }

    #[test]
    fn test_expand_args() {
        let alert = CommandAlert::new(
            "mpg123".to_string(),
            vec![
                "--loop".into(),
                "-1".into(),
                "--scale".into(),
                "{volume}".into(),
                "{file}".into(),
            ],
        );
        assert_eq!(
            alert.expand_args(&sound()),
            vec!["--loop", "-1", "--scale", "65", "/sounds/ring.mp3"]
        );
    }

    #[test]
    fn test_long_running_player_is_killed_on_stop() {
        let mut alert = CommandAlert::new("sleep".to_string(), vec!["30".into()]);
        alert.start(&sound()).unwrap();
        assert!(alert.is_active());
        alert.stop();
        assert!(!alert.is_active());
    }

    #[test]
    fn test_exited_player_is_inactive() {
        let mut alert = CommandAlert::new("true".to_string(), vec![]);
        alert.start(&sound()).unwrap();
        for _ in 0..50 {
            if !alert.is_active() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        panic!("player never exited");
    }

    #[test]
    fn test_missing_program_fails() {
        let mut alert = CommandAlert::new("/nonexistent/player".to_string(), vec![]);
        assert!(matches!(alert.start(&sound()), Err(Error::Alert(_))));
        assert!(!alert.is_active());
    }
}
