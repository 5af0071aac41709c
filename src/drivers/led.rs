//! Status LED output line.
//!
//! Thin wrapper over a sysfs GPIO configured as an output. The value file
//! stays open for the daemon's lifetime; each write rewinds first because
//! the attribute is a stateful stream.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

use log::info;

use crate::app::ports::LedPort;
use crate::drivers::gpio::{self, Direction};
use crate::error::{Error, Result};

pub struct Led {
    pin: u32,
    value: File,
}

impl Led {
    /// Claim `pin` as an output and open its value attribute.
    pub fn open(pin: u32) -> Result<Self> {
        gpio::claim(pin)?;
        let configured = gpio::set_direction(pin, Direction::Out).and_then(|()| {
            OpenOptions::new()
                .write(true)
                .open(gpio::value_path(pin))
                .map_err(|e| Error::gpio(pin, "open value", e))
        });
        match configured {
            Ok(value) => {
                info!("gpio {pin}: LED output ready");
                Ok(Self { pin, value })
            }
            Err(e) => {
                gpio::release(pin);
                Err(e)
            }
        }
    }
}

impl LedPort for Led {
    fn set_level(&mut self, on: bool) -> Result<()> {
        self.value
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.value.write_all(if on { b"1" } else { b"0" }))
            .map_err(|e| Error::io("LED write", e))
    }
}

impl Drop for Led {
    fn drop(&mut self) {
        gpio::release(self.pin);
    }
}
