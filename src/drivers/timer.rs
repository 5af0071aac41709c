//! Blink-period timer over `timerfd`.
//!
//! A monotonic-clock periodic timer whose expirations surface through the
//! same readiness multiplexer as the GPIO lines. The descriptor is
//! non-blocking so a readiness edge that raced an earlier read drains to
//! zero expirations instead of stalling the loop.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use log::info;

use crate::app::ports::TimerPort;
use crate::error::{Error, Result};

pub struct PeriodicTimer {
    fd: OwnedFd,
}

impl PeriodicTimer {
    /// Allocate the timer, unarmed.
    pub fn create() -> Result<Self> {
        // SAFETY: plain syscall; on success the returned descriptor is
        // fresh and exclusively ours, so OwnedFd may assume ownership.
        let fd = unsafe {
            libc::timerfd_create(libc::CLOCK_MONOTONIC, libc::TFD_NONBLOCK | libc::TFD_CLOEXEC)
        };
        if fd < 0 {
            return Err(Error::resource("timerfd create", io::Error::last_os_error()));
        }
        info!("blink timer allocated");
        // SAFETY: fd checked valid above and not shared with anything else.
        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }

    /// Descriptor for multiplexer registration.
    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

fn timespec_from(d: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: d.as_secs() as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    }
}

impl TimerPort for PeriodicTimer {
    fn set_period(&self, period: Duration) -> Result<()> {
        // Initial delay equals the interval: one full period elapses
        // before the first toggle at the new rate.
        let spec = libc::itimerspec {
            it_interval: timespec_from(period),
            it_value: timespec_from(period),
        };
        // SAFETY: fd is valid for our lifetime; spec outlives the call;
        // settime replaces any previous arming atomically.
        let rc = unsafe { libc::timerfd_settime(self.fd.as_raw_fd(), 0, &spec, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(Error::io("timer arm", io::Error::last_os_error()));
        }
        Ok(())
    }

    fn take_expirations(&self) -> Result<u64> {
        let mut buf = [0u8; 8];
        // SAFETY: buf is 8 bytes, the exact read unit the timerfd
        // interface defines; fd is valid.
        let n = unsafe {
            libc::read(self.fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len())
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                // Readiness edge raced a previous drain. Benign.
                return Ok(0);
            }
            return Err(Error::io("timer read", err));
        }
        if n as usize != buf.len() {
            return Err(Error::io(
                "timer read",
                io::Error::other("short read on timerfd"),
            ));
        }
        Ok(u64::from_ne_bytes(buf))
    }
}
