//! sysfs GPIO plumbing.
//!
//! Export/unexport and attribute helpers shared by the LED and button
//! drivers. Claiming is idempotent: a line left exported by a previous
//! owner is released and re-claimed, so direction and edge always start
//! from a clean state.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Time for the kernel to create or remove the per-line attribute files
/// after an export/unexport write.
const SETTLE: Duration = Duration::from_millis(100);

/// Line direction, as written to the sysfs `direction` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Edge sensitivity, as written to the sysfs `edge` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Both,
}

impl Edge {
    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Both => "both",
        }
    }
}

fn line_dir(pin: u32) -> PathBuf {
    PathBuf::from(format!("{GPIO_ROOT}/gpio{pin}"))
}

/// Path of the line's `value` attribute.
pub fn value_path(pin: u32) -> PathBuf {
    line_dir(pin).join("value")
}

/// Whether the line is currently exported.
pub fn is_exported(pin: u32) -> bool {
    line_dir(pin).exists()
}

/// Claim `pin`, releasing it first if it is already exported.
pub fn claim(pin: u32) -> Result<()> {
    if is_exported(pin) {
        debug!("gpio {pin}: already exported, re-claiming");
        release(pin);
        thread::sleep(SETTLE);
    }
    fs::write(format!("{GPIO_ROOT}/export"), pin.to_string())
        .map_err(|e| Error::gpio(pin, "export", e))?;
    thread::sleep(SETTLE);
    Ok(())
}

/// Release `pin`. Best-effort: failures are logged, never propagated,
/// so the unwind path can call this over a half-claimed line.
pub fn release(pin: u32) {
    if let Err(e) = fs::write(format!("{GPIO_ROOT}/unexport"), pin.to_string()) {
        debug!("gpio {pin}: unexport failed: {e}");
    }
}

/// Write the line's `direction` attribute.
pub fn set_direction(pin: u32, direction: Direction) -> Result<()> {
    fs::write(line_dir(pin).join("direction"), direction.as_str())
        .map_err(|e| Error::gpio(pin, "direction", e))
}

/// Write the line's `edge` attribute (inputs only).
pub fn set_edge(pin: u32, edge: Edge) -> Result<()> {
    fs::write(line_dir(pin).join("edge"), edge.as_str())
        .map_err(|e| Error::gpio(pin, "edge", e))
}
