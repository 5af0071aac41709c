//! Daemon configuration parameters.
//!
//! All tunable parameters for the blink daemon. Values can be overridden
//! via an optional JSON config file (`/etc/blinkd.conf` by default); the
//! compiled-in defaults match the NanoPi NEO Plus2 front panel.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;

/// Default location of the optional config file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/blinkd.conf";

/// Core daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    // --- GPIO lines ---
    /// Status LED GPIO number (output).
    pub led_pin: u32,
    /// K1 button GPIO number (increase frequency, auto-repeats).
    pub k1_pin: u32,
    /// K2 button GPIO number (reset frequency).
    pub k2_pin: u32,
    /// K3 button GPIO number (decrease frequency, auto-repeats).
    pub k3_pin: u32,

    // --- Blink frequency (Hz) ---
    /// Frequency at startup and after a reset.
    pub initial_hz: f64,
    /// Step applied per increase/decrease action.
    pub step_hz: f64,
    /// Lower clamp.
    pub min_hz: f64,
    /// Upper clamp.
    pub max_hz: f64,

    // --- Auto-repeat timing ---
    /// Hold time before a button starts repeating (milliseconds).
    pub auto_repeat_delay_ms: u64,
    /// Repeat rate while the button stays held (milliseconds).
    pub auto_repeat_interval_ms: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            // GPIO lines
            led_pin: pins::LED_GPIO,
            k1_pin: pins::K1_GPIO,
            k2_pin: pins::K2_GPIO,
            k3_pin: pins::K3_GPIO,

            // Frequency
            initial_hz: 2.0, // 2 Hz = 250ms on, 250ms off
            step_hz: 0.5,
            min_hz: 0.5,
            max_hz: 10.0,

            // Auto-repeat
            auto_repeat_delay_ms: 500,
            auto_repeat_interval_ms: 200,
        }
    }
}

impl BlinkConfig {
    /// Hold time before auto-repeat starts.
    pub fn auto_repeat_delay(&self) -> Duration {
        Duration::from_millis(self.auto_repeat_delay_ms)
    }

    /// Interval between repeat firings while held.
    pub fn auto_repeat_interval(&self) -> Duration {
        Duration::from_millis(self.auto_repeat_interval_ms)
    }

    /// Range-check the configuration.
    ///
    /// Rejects values that would break the frequency state machine
    /// (non-positive bounds, an initial value outside the clamp range,
    /// a zero step) or the repeat timing, and pin assignments that alias
    /// two roles onto one line.
    pub fn validate(&self) -> Result<()> {
        if self.min_hz <= 0.0 {
            return Err(Error::Config("min_hz must be positive"));
        }
        if self.max_hz < self.min_hz {
            return Err(Error::Config("max_hz must be >= min_hz"));
        }
        if self.initial_hz < self.min_hz || self.initial_hz > self.max_hz {
            return Err(Error::Config("initial_hz must lie within [min_hz, max_hz]"));
        }
        if self.step_hz <= 0.0 {
            return Err(Error::Config("step_hz must be positive"));
        }
        if self.auto_repeat_delay_ms == 0 || self.auto_repeat_interval_ms == 0 {
            return Err(Error::Config("auto-repeat delay and interval must be non-zero"));
        }
        let pins = [self.led_pin, self.k1_pin, self.k2_pin, self.k3_pin];
        for (i, a) in pins.iter().enumerate() {
            if pins[i + 1..].contains(a) {
                return Err(Error::Config("pin assignments must be distinct"));
            }
        }
        Ok(())
    }

    /// Load the configuration from `path`, falling back to defaults.
    ///
    /// `explicit` marks a path the operator asked for (CLI argument): any
    /// failure to read, parse, or validate it is an error. For the default
    /// path, a missing file silently yields defaults and a corrupt file is
    /// logged and replaced by defaults.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                info!("config: no file at {}, using defaults", path.display());
                let cfg = Self::default();
                cfg.validate()?;
                return Ok(cfg);
            }
            Err(e) if explicit => {
                warn!("config: cannot read {}: {}", path.display(), e);
                return Err(Error::Config("config file unreadable"));
            }
            Err(e) => {
                warn!("config: cannot read {}: {}, using defaults", path.display(), e);
                let cfg = Self::default();
                cfg.validate()?;
                return Ok(cfg);
            }
        };

        match serde_json::from_str::<Self>(&text) {
            Ok(cfg) => {
                cfg.validate()?;
                info!("config: loaded from {}", path.display());
                Ok(cfg)
            }
            Err(e) if explicit => {
                warn!("config: cannot parse {}: {}", path.display(), e);
                Err(Error::Config("config file unparseable"))
            }
            Err(e) => {
                warn!("config: cannot parse {}: {}, using defaults", path.display(), e);
                let cfg = Self::default();
                cfg.validate()?;
                Ok(cfg)
            }
        }
    }
}
