//! Port traits — the boundary between the controller core and the platform.
//!
//! ```text
//!   Driver (sysfs / timerfd / epoll) ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! The Linux drivers implement these traits; the
//! [`Controller`](super::controller::Controller) consumes them via generics,
//! so the core never touches a file descriptor directly and the whole state
//! machine runs on the host under mock ports.

use std::time::Duration;

use crate::error::Result;

/// Number of front-panel buttons the controller manages.
pub const BUTTON_COUNT: usize = 3;

// ───────────────────────────────────────────────────────────────
// Readiness source tags
// ───────────────────────────────────────────────────────────────

/// Identity of a registered readiness source.
///
/// Registrations carry a `Source` rather than a bare file descriptor, so
/// the main loop dispatches with a direct `match` instead of comparing
/// handle identities. The tag is encoded into the multiplexer's per-fd
/// user data and decoded on the way back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The blink-period timer.
    Timer,
    /// A front-panel button, by controller slot index (0-based).
    Button(u8),
}

impl Source {
    /// Encode the tag for the multiplexer's user-data word.
    pub fn token(self) -> u64 {
        match self {
            Self::Timer => 0,
            Self::Button(i) => 1 + u64::from(i),
        }
    }

    /// Decode a user-data word back into a tag.
    ///
    /// Returns `None` for words this daemon never registers.
    pub fn from_token(token: u64) -> Option<Self> {
        match token {
            0 => Some(Self::Timer),
            n if n <= BUTTON_COUNT as u64 => Some(Self::Button((n - 1) as u8)),
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// LED port (domain → output line)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the controller drives the status LED through this.
pub trait LedPort {
    /// Drive the LED level immediately; no buffering.
    fn set_level(&mut self, on: bool) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Button port (input line → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the controller samples a button level through this.
pub trait ButtonPort {
    /// Read the current level. `true` = pressed.
    ///
    /// Called once per readiness event for the button's source; the
    /// implementation rewinds the underlying stream before reading.
    fn read_level(&mut self) -> Result<bool>;
}

// ───────────────────────────────────────────────────────────────
// Timer port (domain ↔ periodic timer)
// ───────────────────────────────────────────────────────────────

/// Periodic timer: armed by the frequency dial, drained by the main loop.
///
/// Methods take `&self` and implementations must be `Send + Sync`: the
/// dial re-arms the timer from auto-repeat threads through a shared
/// reference.
pub trait TimerPort: Send + Sync {
    /// Arm the timer to fire once after `period` and every `period`
    /// thereafter. Replaces any previous arming atomically.
    fn set_period(&self, period: Duration) -> Result<()>;

    /// Consume pending expirations after a readiness event.
    ///
    /// Returns the number of intervals elapsed since the last read
    /// (normally 1; more means the loop fell behind, which is fine;
    /// 0 means the readiness edge raced a previous read).
    fn take_expirations(&self) -> Result<u64>;
}

// ───────────────────────────────────────────────────────────────
// Poll port (readiness multiplexer → domain)
// ───────────────────────────────────────────────────────────────

/// Bounded readiness wait over every registered source.
pub trait PollPort {
    /// Block until at least one source is ready or `timeout` elapses.
    ///
    /// An empty vector means "nothing ready" (timeout or benign signal
    /// interruption); errors are reserved for unrecoverable multiplexer
    /// failures.
    fn wait(&self, timeout: Duration) -> Result<Vec<Source>>;
}
