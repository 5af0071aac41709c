//! Readiness multiplexer over `epoll`.
//!
//! Registrations carry a [`Source`] tag in the per-descriptor user data,
//! so [`wait`](Poller::wait) hands the main loop decoded tags rather than
//! raw descriptors. All interest is edge-triggered: a source is reported
//! once per readiness transition and must be drained before it will be
//! reported again.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use log::{info, warn};

use crate::app::ports::{PollPort, Source};
use crate::error::{Error, Result};

/// More than the daemon ever registers (timer + three buttons).
const MAX_EVENTS: usize = 8;

pub struct Poller {
    fd: OwnedFd,
}

impl Poller {
    /// Allocate the multiplexer with no registrations.
    pub fn create() -> Result<Self> {
        // SAFETY: plain syscall; a non-negative return is a fresh
        // descriptor owned by us alone.
        let fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if fd < 0 {
            return Err(Error::resource("epoll create", io::Error::last_os_error()));
        }
        info!("readiness multiplexer allocated");
        // SAFETY: fd checked valid above.
        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }

    /// Register `fd` under `source`.
    ///
    /// Interest is readable + priority, edge-triggered; sysfs GPIO value
    /// readiness arrives as priority data, timerfd as readable.
    pub fn register(&self, fd: RawFd, source: Source) -> Result<()> {
        let mut event = libc::epoll_event {
            events: (libc::EPOLLIN | libc::EPOLLPRI | libc::EPOLLET) as u32,
            u64: source.token(),
        };
        // SAFETY: both descriptors are valid; event outlives the call.
        let rc = unsafe {
            libc::epoll_ctl(self.fd.as_raw_fd(), libc::EPOLL_CTL_ADD, fd, &mut event)
        };
        if rc < 0 {
            return Err(Error::resource("epoll register", io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Remove `fd` from the interest set.
    ///
    /// Teardown calls this before the lines close so deregistration
    /// mirrors registration; the kernel would drop a closed descriptor
    /// on its own.
    pub fn unregister(&self, fd: RawFd) -> Result<()> {
        // SAFETY: both descriptors are valid; DEL ignores the event
        // argument on any kernel this daemon targets.
        let rc = unsafe {
            libc::epoll_ctl(
                self.fd.as_raw_fd(),
                libc::EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        };
        if rc < 0 {
            return Err(Error::resource("epoll unregister", io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl PollPort for Poller {
    fn wait(&self, timeout: Duration) -> Result<Vec<Source>> {
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; MAX_EVENTS];
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        // SAFETY: events is a valid buffer of MAX_EVENTS entries; the
        // kernel writes at most that many.
        let n = unsafe {
            libc::epoll_wait(
                self.fd.as_raw_fd(),
                events.as_mut_ptr(),
                MAX_EVENTS as i32,
                timeout_ms,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                // A benign signal cut the wait short; the loop's next
                // iteration observes any shutdown request.
                return Ok(Vec::new());
            }
            return Err(Error::Poll(err));
        }

        let mut ready = Vec::with_capacity(n as usize);
        for event in &events[..n as usize] {
            // Copy out first: epoll_event is packed, its fields cannot be
            // borrowed in place.
            let token = event.u64;
            match Source::from_token(token) {
                Some(source) => ready.push(source),
                None => warn!("readiness event with unknown token {token}"),
            }
        }
        Ok(ready)
    }
}
