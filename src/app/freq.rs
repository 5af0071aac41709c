//! Blink-frequency state.
//!
//! One scalar, clamped to a configured range, with the timer re-arm folded
//! into the same critical section: whoever changes the frequency also arms
//! the timer before anyone else can intervene. The dial is shared as `Arc`
//! between the controller's main loop and the auto-repeat threads — the
//! only state in the daemon touched from more than one thread.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{error, info};

use crate::app::ports::TimerPort;
use crate::config::BlinkConfig;
use crate::error::Result;

/// Frequency-change actions bound to the front-panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreqAction {
    /// Step up by `step_hz`, clamped to `max_hz`.
    Increase,
    /// Step down by `step_hz`, floored at `min_hz`.
    Decrease,
    /// Return to `initial_hz` unconditionally.
    Reset,
}

/// Convert a frequency into the timer period that realises it.
pub fn period_for(hz: f64) -> Duration {
    Duration::from_nanos((1e9 / hz) as u64)
}

/// The clamped frequency scalar plus timer re-arm, behind one lock.
pub struct FrequencyDial<T: TimerPort> {
    hz: Mutex<f64>,
    timer: Arc<T>,
    initial_hz: f64,
    step_hz: f64,
    min_hz: f64,
    max_hz: f64,
}

impl<T: TimerPort> FrequencyDial<T> {
    pub fn new(cfg: &BlinkConfig, timer: Arc<T>) -> Self {
        Self {
            hz: Mutex::new(cfg.initial_hz),
            timer,
            initial_hz: cfg.initial_hz,
            step_hz: cfg.step_hz,
            min_hz: cfg.min_hz,
            max_hz: cfg.max_hz,
        }
    }

    /// Arm the timer at the current frequency. Used once at startup;
    /// afterwards every re-arm happens inside [`apply`](Self::apply).
    pub fn arm(&self) -> Result<()> {
        let hz = self.hz.lock().unwrap_or_else(PoisonError::into_inner);
        self.timer.set_period(period_for(*hz))
    }

    /// Apply a frequency-change action and re-arm the timer.
    ///
    /// Boundary no-ops (increase at max, decrease at min) leave the timer
    /// untouched. A re-arm failure is logged and the new frequency kept;
    /// the next successful action re-arms. Returns the frequency in force
    /// after the action.
    pub fn apply(&self, action: FreqAction) -> f64 {
        let mut hz = self.hz.lock().unwrap_or_else(PoisonError::into_inner);
        let next = match action {
            FreqAction::Increase => (*hz + self.step_hz).min(self.max_hz),
            FreqAction::Decrease => (*hz - self.step_hz).max(self.min_hz),
            FreqAction::Reset => self.initial_hz,
        };

        let unchanged = (next - *hz).abs() < f64::EPSILON;
        if unchanged && action != FreqAction::Reset {
            match action {
                FreqAction::Increase => info!("frequency already at maximum ({:.1} Hz)", *hz),
                FreqAction::Decrease => info!("frequency already at minimum ({:.1} Hz)", *hz),
                FreqAction::Reset => {}
            }
            return *hz;
        }

        *hz = next;
        if let Err(e) = self.timer.set_period(period_for(next)) {
            error!("frequency: timer re-arm failed: {e}");
        } else {
            match action {
                FreqAction::Increase => info!("frequency increased to {next:.1} Hz"),
                FreqAction::Decrease => info!("frequency decreased to {next:.1} Hz"),
                FreqAction::Reset => info!("frequency reset to {next:.1} Hz"),
            }
        }
        next
    }

    /// Frequency currently in force.
    pub fn current(&self) -> f64 {
        *self.hz.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
