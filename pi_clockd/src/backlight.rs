//! Display brightness.

use std::{fs, path::PathBuf};

use log::{debug, info};

use crate::{
    config::BacklightConfig,
    error::{Error, Result},
};

/// Used when the panel does not report its maximum.
pub const FALLBACK_MAX_BRIGHTNESS: u32 = 255;

pub trait Backlight: Send {
    fn max(&self) -> u32;
    /// Sets the brightness, clamped to `0..=max`, and returns the value written.
    fn set(&mut self, value: u32) -> Result<u32>;
}

#[must_use]
pub fn build_backlight(config: &BacklightConfig) -> Box<dyn Backlight> {
    if config.enabled {
        Box::new(SysfsBacklight::new(
            config.brightness_path.clone(),
            config.max_brightness_path.clone(),
        ))
    } else {
        Box::new(NullBacklight)
    }
}

/// Backlight class device, e.g. the official Raspberry Pi 7" touchscreen.
#[derive(Debug, Clone)]
pub struct SysfsBacklight {
    brightness_path: PathBuf,
    max_path: PathBuf,
}

impl SysfsBacklight {
    #[must_use]
    pub const fn new(brightness_path: PathBuf, max_path: PathBuf) -> Self {
        Self {
            brightness_path,
            max_path,
        }
    }
}

impl Backlight for SysfsBacklight {
    fn max(&self) -> u32 {
        fs::read_to_string(&self.max_path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(FALLBACK_MAX_BRIGHTNESS)
    }

    fn set(&mut self, value: u32) -> Result<u32> {
        let value = value.min(self.max());
        fs::write(&self.brightness_path, value.to_string()).map_err(|e| Error::Backlight {
            path: self.brightness_path.clone(),
            source: e,
        })?;
        debug!("brightness set to {value}");
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullBacklight;

impl Backlight for NullBacklight {
    fn max(&self) -> u32 {
        FALLBACK_MAX_BRIGHTNESS
    }

    fn set(&mut self, value: u32) -> Result<u32> {
        let value = value.min(FALLBACK_MAX_BRIGHTNESS);
        info!("brightness {value} (no backlight)");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_falls_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backlight = SysfsBacklight::new(
            temp_dir.path().join("brightness"),
            temp_dir.path().join("max_brightness"),
        );
        assert_eq!(backlight.max(), 255);
    }

    #[test]
    fn test_set_clamps_to_max() {
        let temp_dir = tempfile::tempdir().unwrap();
        let brightness = temp_dir.path().join("brightness");
        let max = temp_dir.path().join("max_brightness");
        fs::write(&max, "200\n").unwrap();
        let mut backlight = SysfsBacklight::new(brightness.clone(), max);

        assert_eq!(backlight.max(), 200);
        assert_eq!(backlight.set(250).unwrap(), 200);
        assert_eq!(fs::read_to_string(&brightness).unwrap(), "200");
        assert_eq!(backlight.set(40).unwrap(), 40);
        assert_eq!(fs::read_to_string(&brightness).unwrap(), "40");
    }

    #[test]
    fn test_set_missing_device_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut backlight = SysfsBacklight::new(
            temp_dir.path().join("missing").join("brightness"),
            temp_dir.path().join("max_brightness"),
        );
        assert!(matches!(backlight.set(100), Err(Error::Backlight { .. })));
    }

    #[test]
    fn test_disabled_config_builds_null() {
        let config = BacklightConfig {
            enabled: false,
            ..BacklightConfig::default()
        };
        let mut backlight = build_backlight(&config);
        assert_eq!(backlight.set(1000).unwrap(), 255);
    }
}
