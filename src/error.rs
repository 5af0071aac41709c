//! Unified error types for the blink daemon.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! main loop's error handling uniform. Variants separate fatal startup
//! failures (resource allocation, line configuration, bad config) from
//! per-event I/O failures the loop survives.

use std::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level daemon error
// ---------------------------------------------------------------------------

/// Every fallible operation in the daemon funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// A GPIO line could not be claimed or configured.
    Gpio {
        pin: u32,
        op: &'static str,
        source: io::Error,
    },
    /// A kernel resource (timer, multiplexer) could not be allocated.
    Resource {
        what: &'static str,
        source: io::Error,
    },
    /// A read or write on an already-open handle failed.
    Io {
        what: &'static str,
        source: io::Error,
    },
    /// The multiplexer wait failed for a reason other than interruption.
    Poll(io::Error),
    /// Configuration is invalid.
    Config(&'static str),
}

impl Error {
    pub fn gpio(pin: u32, op: &'static str, source: io::Error) -> Self {
        Self::Gpio { pin, op, source }
    }

    pub fn resource(what: &'static str, source: io::Error) -> Self {
        Self::Resource { what, source }
    }

    pub fn io(what: &'static str, source: io::Error) -> Self {
        Self::Io { what, source }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio { pin, op, source } => write!(f, "gpio {pin}: {op}: {source}"),
            Self::Resource { what, source } => write!(f, "{what}: {source}"),
            Self::Io { what, source } => write!(f, "{what}: {source}"),
            Self::Poll(source) => write!(f, "poll wait: {source}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpio { source, .. } | Self::Resource { source, .. } | Self::Io { source, .. } => {
                Some(source)
            }
            Self::Poll(source) => Some(source),
            Self::Config(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Daemon-wide `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;
