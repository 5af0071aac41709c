//! Front-panel button input line.
//!
//! Wraps a sysfs GPIO configured as an edge-sensitive input. The value
//! file stays open so its descriptor can live in the multiplexer for the
//! daemon's lifetime; each sample rewinds first because the attribute is
//! a stateful stream.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::os::fd::{AsRawFd, RawFd};

use log::info;

use crate::app::ports::ButtonPort;
use crate::drivers::gpio::{self, Direction, Edge};
use crate::error::{Error, Result};

pub struct Button {
    pin: u32,
    value: File,
}

impl Button {
    /// Claim `pin` as an input with both-edge reporting and open its
    /// value attribute.
    pub fn open(pin: u32) -> Result<Self> {
        gpio::claim(pin)?;
        let configured = gpio::set_direction(pin, Direction::In)
            .and_then(|()| gpio::set_edge(pin, Edge::Both))
            .and_then(|()| {
                OpenOptions::new()
                    .read(true)
                    .open(gpio::value_path(pin))
                    .map_err(|e| Error::gpio(pin, "open value", e))
            });
        match configured {
            Ok(value) => {
                let mut button = Self { pin, value };
                // A freshly-opened value fd reports priority data once
                // before any edge occurs; drain it so the first poll
                // readiness corresponds to a real transition.
                let _ = button.sample();
                info!("gpio {pin}: button input ready");
                Ok(button)
            }
            Err(e) => {
                gpio::release(pin);
                Err(e)
            }
        }
    }

    /// Descriptor for multiplexer registration.
    pub fn raw_fd(&self) -> RawFd {
        self.value.as_raw_fd()
    }

    fn sample(&mut self) -> Result<bool> {
        let mut buf = [0u8; 2];
        self.value
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.value.read(&mut buf))
            .map(|n| n > 0 && buf[0] == b'1')
            .map_err(|e| Error::io("button read", e))
    }
}

impl ButtonPort for Button {
    fn read_level(&mut self) -> Result<bool> {
        self.sample()
    }
}

impl Drop for Button {
    fn drop(&mut self) {
        gpio::release(self.pin);
    }
}
