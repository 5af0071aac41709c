//! blinkd library crate.
//!
//! Exposes the daemon's modules for integration testing: the application
//! core under [`app`] is hardware-free and runs entirely under mock ports;
//! the Linux drivers under [`drivers`] need real sysfs/timerfd/epoll and
//! are only exercised on target.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod repeat;

mod pins;
