//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the blink daemon: the
//! button state machine, frequency clamping, and auto-repeat management.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real GPIO
//! lines or kernel timers.

pub mod controller;
pub mod freq;
pub mod ports;
