//! Battery backed real time clock, through `hwclock`.

use std::{
    process::Command,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{select, Receiver};
use log::{info, warn};

use crate::error::{Error, Result};

/// Sets the system time from the RTC.
pub fn hwclock_to_system(hwclock: &str) -> Result<()> {
    run(hwclock, "--hctosys")
}

/// Writes the system time to the RTC.
pub fn system_to_hwclock(hwclock: &str) -> Result<()> {
    run(hwclock, "--systohc")
}

/// Writes the system time to the RTC every `interval` until `shutdown` fires
/// or closes.
pub fn spawn_writer(
    hwclock: String,
    interval: Duration,
    shutdown: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rtc".to_string())
        .spawn(move || {
            let ticker = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if let Err(e) = system_to_hwclock(&hwclock) {
                            warn!("{e}");
                        }
                    }
                    recv(shutdown) -> _ => break,
                }
            }
        })
}

fn run(program: &str, flag: &str) -> Result<()> {
    let output = Command::new(program)
        .arg(flag)
        .output()
        .map_err(|e| Error::Rtc(format!("couldn't run {program}: {e}")))?;
    if output.status.success() {
        info!("{program} {flag} done");
        Ok(())
    } else {
        Err(Error::Rtc(format!(
            "{program} {flag} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_success() {
        run("true", "--hctosys").unwrap();
    }

    #[test]
    fn test_writer_runs_until_shutdown() {
        let (shutdown_tx, shutdown) = crossbeam_channel::bounded(0);
        let writer =
            spawn_writer("true".to_string(), Duration::from_millis(10), shutdown).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        drop(shutdown_tx);
        writer.join().unwrap();
    }

    #[test]
    fn test_sync_both_ways() {
        hwclock_to_system("true").unwrap();
        system_to_hwclock("true").unwrap();
        assert!(matches!(system_to_hwclock("false"), Err(Error::Rtc(_))));
    }

    #[test]
    fn test_run_failure_is_rtc_error() {
        assert!(matches!(run("false", "--systohc"), Err(Error::Rtc(_))));
        assert!(matches!(
            run("/nonexistent/hwclock", "--hctosys"),
            Err(Error::Rtc(_))
        ));
    }
}
