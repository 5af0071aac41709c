//! Linux platform drivers.
//!
//! Safe wrappers around the kernel interfaces the daemon rides on: sysfs
//! GPIO lines, a `timerfd` blink timer, and an `epoll` readiness
//! multiplexer. Each wrapper implements the matching port trait from
//! [`crate::app::ports`], keeping all descriptor handling out of the core.

pub mod button;
pub mod gpio;
pub mod led;
pub mod poller;
pub mod timer;
