//! GPIO pin assignments for the NanoPi NEO Plus2 front panel.
//!
//! Single source of truth — `BlinkConfig::default()` references this module
//! rather than hard-coding pin numbers. Change a pin here and it propagates
//! everywhere.
//!
//! Numbers are sysfs GPIO ids (port A offsets on the Allwinner H5).

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// Blinking status LED (GPIOA10, active HIGH).
pub const LED_GPIO: u32 = 10;

// ---------------------------------------------------------------------------
// Front-panel buttons (active-high, hardware edge reporting)
// ---------------------------------------------------------------------------

/// K1 — increase blink frequency. Auto-repeats while held.
pub const K1_GPIO: u32 = 0;
/// K2 — reset blink frequency to the configured initial value.
pub const K2_GPIO: u32 = 2;
/// K3 — decrease blink frequency. Auto-repeats while held.
pub const K3_GPIO: u32 = 3;
