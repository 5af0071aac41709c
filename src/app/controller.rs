//! Controller — the event-driven core.
//!
//! [`Controller`] owns the LED, the three buttons, the periodic timer, and
//! the frequency dial. It exposes a clean, hardware-agnostic API: all I/O
//! flows through the port traits in [`super::ports`], so the whole state
//! machine runs under mock ports on the host.
//!
//! ```text
//!  PollPort.wait() ──▶ ┌──────────────────────────┐ ──▶ LedPort
//!                      │        Controller         │
//!  ButtonPort.read ◀───│  debounce · dial · repeat │ ──▶ TimerPort
//!                      └──────────────────────────┘
//! ```
//!
//! Per button the state machine is two states, `Released` and `Pressed`,
//! committed from the level read on each readiness event. A commit to
//! `Pressed` fires the button's action and, for K1/K3, arms an auto-repeat
//! task; a commit to `Released` cancels it. An unchanged level is ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::freq::{FreqAction, FrequencyDial};
use crate::app::ports::{BUTTON_COUNT, ButtonPort, LedPort, PollPort, Source, TimerPort};
use crate::config::BlinkConfig;
use crate::error::Result;
use crate::repeat::{self, RepeatHandle};

/// Bounded multiplexer wait; bounds worst-case shutdown latency.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Consecutive handler failures tolerated per source before the loop gives
/// up on the handle and exits.
const IO_STRIKE_LIMIT: u32 = 5;

// ───────────────────────────────────────────────────────────────
// Button roles
// ───────────────────────────────────────────────────────────────

/// What a button does and whether holding it repeats the action.
#[derive(Debug, Clone, Copy)]
struct ButtonRole {
    name: &'static str,
    action: FreqAction,
    auto_repeats: bool,
}

/// Front-panel layout, in controller slot order.
const ROLES: [ButtonRole; BUTTON_COUNT] = [
    ButtonRole {
        name: "K1",
        action: FreqAction::Increase,
        auto_repeats: true,
    },
    ButtonRole {
        name: "K2",
        action: FreqAction::Reset,
        auto_repeats: false,
    },
    ButtonRole {
        name: "K3",
        action: FreqAction::Decrease,
        auto_repeats: true,
    },
];

/// Per-button live state.
struct ButtonSlot<B> {
    line: B,
    role: ButtonRole,
    /// Last committed level. Shared with the repeat task, which re-checks
    /// it on every invocation and stops itself once the button is up.
    pressed: Arc<AtomicBool>,
    repeat: Option<RepeatHandle>,
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// The daemon core. Field order keeps drops in reverse order of
/// acquisition (timer, then buttons, then LED).
pub struct Controller<B, L, T>
where
    B: ButtonPort,
    L: LedPort,
    T: TimerPort + 'static,
{
    timer: Arc<T>,
    dial: Arc<FrequencyDial<T>>,
    buttons: [ButtonSlot<B>; BUTTON_COUNT],
    led: L,
    led_on: bool,
    auto_repeat_delay: Duration,
    auto_repeat_interval: Duration,
    /// Consecutive failures per source, indexed by `Source::token()`.
    io_strikes: [u32; BUTTON_COUNT + 1],
}

impl<B, L, T> Controller<B, L, T>
where
    B: ButtonPort,
    L: LedPort,
    T: TimerPort + 'static,
{
    /// Wire up the core. Buttons are given in slot order (K1, K2, K3).
    ///
    /// Does **not** touch the hardware — call [`start`](Self::start) next.
    pub fn new(led: L, buttons: [B; BUTTON_COUNT], timer: Arc<T>, cfg: &BlinkConfig) -> Self {
        let dial = Arc::new(FrequencyDial::new(cfg, Arc::clone(&timer)));
        let mut slot_idx = 0;
        let buttons = buttons.map(|line| {
            let slot = ButtonSlot {
                line,
                role: ROLES[slot_idx],
                pressed: Arc::new(AtomicBool::new(false)),
                repeat: None,
            };
            slot_idx += 1;
            slot
        });
        Self {
            timer,
            dial,
            buttons,
            led,
            led_on: false,
            auto_repeat_delay: cfg.auto_repeat_delay(),
            auto_repeat_interval: cfg.auto_repeat_interval(),
            io_strikes: [0; BUTTON_COUNT + 1],
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the LED to its initial (on) state and arm the timer at the
    /// configured initial frequency.
    pub fn start(&mut self) -> Result<()> {
        self.led_on = true;
        self.led.set_level(true)?;
        self.dial.arm()?;
        info!("blinking at {:.1} Hz", self.dial.current());
        Ok(())
    }

    /// Run the main loop until `shutdown` is raised.
    ///
    /// Per-event handler failures are logged and the loop continues; a
    /// source that fails `IO_STRIKE_LIMIT` times in a row is assumed dead
    /// and aborts the loop. Multiplexer failures abort immediately.
    pub fn run(&mut self, poll: &impl PollPort, shutdown: &AtomicBool) -> Result<()> {
        while !shutdown.load(Ordering::SeqCst) {
            let ready = poll.wait(POLL_TIMEOUT)?;
            for source in ready {
                if let Err(e) = self.dispatch(source) {
                    let strikes = self.note_failure(source);
                    if strikes >= IO_STRIKE_LIMIT {
                        error!(
                            "{}: {e}; {strikes} consecutive failures, giving up",
                            source_name(source)
                        );
                        return Err(e);
                    }
                    error!("{}: {e}", source_name(source));
                } else {
                    self.note_success(source);
                }
            }
        }
        info!("shutdown requested");
        Ok(())
    }

    /// Cancel auto-repeat tasks and drive the LED to a defined off state.
    /// Line and timer teardown happens in the drop order described above.
    pub fn shutdown(&mut self) {
        for slot in &mut self.buttons {
            if let Some(mut repeat) = slot.repeat.take() {
                repeat.cancel();
            }
        }
        self.led_on = false;
        if let Err(e) = self.led.set_level(false) {
            warn!("LED off during shutdown failed: {e}");
        }
    }

    // ── Event handling ────────────────────────────────────────

    /// Handle one readiness event.
    pub fn dispatch(&mut self, source: Source) -> Result<()> {
        match source {
            Source::Timer => self.on_timer(),
            Source::Button(idx) => self.on_button(usize::from(idx)),
        }
    }

    /// Timer fired: consume the expiration count and toggle the LED.
    /// This is the only path that mutates LED state.
    fn on_timer(&mut self) -> Result<()> {
        let expirations = self.timer.take_expirations()?;
        if expirations == 0 {
            return Ok(());
        }
        self.led_on = !self.led_on;
        self.led.set_level(self.led_on)
    }

    /// Button line became ready: read the level and commit a transition
    /// if it differs from the last committed one.
    fn on_button(&mut self, idx: usize) -> Result<()> {
        let Some(slot) = self.buttons.get_mut(idx) else {
            warn!("readiness event for unknown button slot {idx}");
            return Ok(());
        };
        let level = slot.line.read_level()?;
        if level == slot.pressed.load(Ordering::SeqCst) {
            return Ok(());
        }
        slot.pressed.store(level, Ordering::SeqCst);
        let role = slot.role;

        if level {
            debug!("{} pressed", role.name);
            self.dial.apply(role.action);
            if role.auto_repeats {
                self.arm_repeat(idx);
            }
        } else {
            debug!("{} released", role.name);
            if let Some(mut repeat) = self.buttons[idx].repeat.take() {
                repeat.cancel();
            }
        }
        Ok(())
    }

    /// Current blink frequency in Hz.
    pub fn current_hz(&self) -> f64 {
        self.dial.current()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Start the hold-to-repeat task for the button in `idx`.
    ///
    /// The callback captures only the shared `pressed` flag and the dial:
    /// it re-reads the committed state on every fire, so a release that
    /// races an in-flight invocation ends the recurrence instead of
    /// firing on stale state.
    fn arm_repeat(&mut self, idx: usize) {
        let slot = &mut self.buttons[idx];
        if let Some(mut old) = slot.repeat.take() {
            old.cancel();
        }
        let pressed = Arc::clone(&slot.pressed);
        let dial = Arc::clone(&self.dial);
        let action = slot.role.action;
        let name = slot.role.name;
        let spawned = repeat::spawn(self.auto_repeat_delay, self.auto_repeat_interval, move || {
            if !pressed.load(Ordering::SeqCst) {
                return false;
            }
            dial.apply(action);
            true
        });
        match spawned {
            Ok(handle) => {
                slot.repeat = Some(handle);
                debug!("{name} auto-repeat armed");
            }
            Err(e) => error!("{name} auto-repeat unavailable: {e}"),
        }
    }

    fn note_failure(&mut self, source: Source) -> u32 {
        // Tokens beyond the table (unknown button slots) take the same
        // tolerate-and-continue path as on_button.
        match self.io_strikes.get_mut(source.token() as usize) {
            Some(strikes) => {
                *strikes += 1;
                *strikes
            }
            None => 0,
        }
    }

    fn note_success(&mut self, source: Source) {
        if let Some(strikes) = self.io_strikes.get_mut(source.token() as usize) {
            *strikes = 0;
        }
    }
}

fn source_name(source: Source) -> &'static str {
    match source {
        Source::Timer => "timer",
        Source::Button(idx) => ROLES
            .get(usize::from(idx))
            .map_or("button", |role| role.name),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
