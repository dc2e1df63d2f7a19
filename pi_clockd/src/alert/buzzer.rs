use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{RecvTimeoutError, Sender};
use log::{debug, error};

use super::{Alert, AlertSound};
use crate::error::{Error, Result};

pub const GPIO_ROOT: &str = "/sys/class/gpio";

/// An output pin driven through the sysfs GPIO interface.
#[derive(Debug)]
pub struct Gpio {
    pin: u32,
    value_path: PathBuf,
}

impl Gpio {
    /// Exports `pin` under `root` if needed and sets it as an output.
    pub fn export(pin: u32, root: &Path) -> Result<Self> {
        let dir = root.join(format!("gpio{pin}"));
        if !dir.exists() {
            let export = root.join("export");
            fs::write(&export, pin.to_string()).map_err(|e| Error::file(export, e))?;
        }
        let direction = dir.join("direction");
        fs::write(&direction, "out").map_err(|e| Error::file(direction, e))?;
        debug!("GPIO {pin} exported as output");
        Ok(Self {
            pin,
            value_path: dir.join("value"),
        })
    }

    pub fn set(&self, high: bool) -> Result<()> {
        fs::write(&self.value_path, if high { "1" } else { "0" })
            .map_err(|e| Error::file(&self.value_path, e))
    }

    #[must_use]
    pub const fn pin(&self) -> u32 {
        self.pin
    }
}

/// Beeps a buzzer: pin high for `on`, low for `off`, until stopped.
#[derive(Debug)]
pub struct BuzzerAlert {
    gpio: Arc<Gpio>,
    on: Duration,
    off: Duration,
    active: Arc<AtomicBool>,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl BuzzerAlert {
    #[must_use]
    pub fn new(gpio: Gpio, on: Duration, off: Duration) -> Self {
        Self {
            gpio: Arc::new(gpio),
            on,
            off,
            active: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Alert for BuzzerAlert {
    fn start(&mut self, _sound: &AlertSound) -> Result<()> {
        self.stop();
        // nothing is ever sent, dropping the sender is the stop signal
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let gpio = Arc::clone(&self.gpio);
        let active = Arc::clone(&self.active);
        let (on, off) = (self.on, self.off);
        active.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name(format!("buzzer-{}", gpio.pin()))
            .spawn(move || {
                let stopped = |wait: Duration| {
                    !matches!(stop_rx.recv_timeout(wait), Err(RecvTimeoutError::Timeout))
                };
                loop {
                    if let Err(e) = gpio.set(true) {
                        error!("buzzer stopped: {e}");
                        break;
                    }
                    if stopped(on) {
                        break;
                    }
                    if let Err(e) = gpio.set(false) {
                        error!("buzzer stopped: {e}");
                        break;
                    }
                    if stopped(off) {
                        break;
                    }
                }
                let _ = gpio.set(false);
                active.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.active.store(false, Ordering::SeqCst);
                Error::Alert(format!("couldn't start buzzer thread: {e}"))
            })?;
        self.worker = Some((stop_tx, handle));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            drop(stop_tx);
            if handle.join().is_err() {
                error!("buzzer thread panicked");
            }
        }
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&mut self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for BuzzerAlert {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_gpio_root(pin: u32) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(format!("gpio{pin}"))).unwrap();
        root
    }

    #[test]
    fn test_export_existing_pin_sets_direction() {
        let root = fake_gpio_root(23);
        let gpio = Gpio::export(23, root.path()).unwrap();
        assert_eq!(gpio.pin(), 23);
        let direction = fs::read_to_string(root.path().join("gpio23/direction")).unwrap();
        assert_eq!(direction, "out");
    }

    #[test]
    fn test_export_missing_root_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("no-gpio");
        assert!(Gpio::export(23, &missing).is_err());
    }

    #[test]
    fn test_buzzer_start_and_stop() {
        let root = fake_gpio_root(17);
        let gpio = Gpio::export(17, root.path()).unwrap();
        let value = root.path().join("gpio17/value");
        let mut buzzer =
            BuzzerAlert::new(gpio, Duration::from_millis(20), Duration::from_millis(20));
        let sound = AlertSound {
            path: None,
            volume: 50,
        };

        buzzer.start(&sound).unwrap();
        assert!(buzzer.is_active());
        for _ in 0..100 {
            if value.exists() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(value.exists());

        buzzer.stop();
        assert!(!buzzer.is_active());
        assert_eq!(fs::read_to_string(&value).unwrap(), "0");
    }
}
