//! blinkd — status-LED blink daemon for the NanoPi NEO Plus2 front panel.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Drivers (Linux platform)                   │
//! │                                                              │
//! │   Led          Button ×3       PeriodicTimer    Poller       │
//! │   (sysfs out)  (sysfs in,      (timerfd)        (epoll)      │
//! │                 edge both)                                   │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ────────────────────   │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            Controller (hardware-free core)             │  │
//! │  │  button state machine · FrequencyDial · auto-repeat    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! K1 raises the blink frequency, K3 lowers it, K2 resets it; K1 and K3
//! auto-repeat while held. SIGINT/SIGTERM shut the daemon down cleanly:
//! LED off, lines released, exit 0.

#![deny(unused_must_use)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::{LevelFilter, info, warn};
use syslog::{BasicLogger, Facility, Formatter3164};

use blinkd::app::controller::Controller;
use blinkd::app::ports::Source;
use blinkd::config::{BlinkConfig, DEFAULT_CONFIG_PATH};
use blinkd::drivers::button::Button;
use blinkd::drivers::led::Led;
use blinkd::drivers::poller::Poller;
use blinkd::drivers::timer::PeriodicTimer;

/// Route the `log` facade to the local syslog daemon under the `blinkd`
/// tag. Without a reachable syslog socket the daemon has no way to report
/// anything, so failure here is fatal (echoed on stderr by `main`'s error
/// return).
fn init_syslog() -> Result<()> {
    let formatter = Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "blinkd".into(),
        pid: std::process::id(),
    };
    let backend = syslog::unix(formatter).context("syslog unavailable")?;
    log::set_boxed_logger(Box::new(BasicLogger::new(backend)))
        .context("logger already installed")?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    init_syslog()?;
    info!("blinkd v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    // First CLI argument overrides the default config path; an explicit
    // path that fails to load is fatal, the default one falls back to
    // compiled-in values.
    let args: Vec<String> = std::env::args().collect();
    let (path, explicit) = match args.get(1) {
        Some(p) => (Path::new(p.as_str()), true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    let cfg = BlinkConfig::load(path, explicit).context("configuration")?;

    // ── 3. Shutdown signal ────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("signal handler")?;

    // ── 4. GPIO lines ─────────────────────────────────────────
    let led = Led::open(cfg.led_pin).context("LED line")?;
    let k1 = Button::open(cfg.k1_pin).context("K1 line")?;
    let k2 = Button::open(cfg.k2_pin).context("K2 line")?;
    let k3 = Button::open(cfg.k3_pin).context("K3 line")?;

    // ── 5. Multiplexer and blink timer ────────────────────────
    let poller = Poller::create()?;
    poller.register(k1.raw_fd(), Source::Button(0))?;
    poller.register(k2.raw_fd(), Source::Button(1))?;
    poller.register(k3.raw_fd(), Source::Button(2))?;

    let timer = Arc::new(PeriodicTimer::create()?);
    poller.register(timer.raw_fd(), Source::Timer)?;

    // Kept for deregistration after the lines move into the controller.
    let registered = [timer.raw_fd(), k1.raw_fd(), k2.raw_fd(), k3.raw_fd()];

    // ── 6. Controller ─────────────────────────────────────────
    let mut controller = Controller::new(led, [k1, k2, k3], timer, &cfg);
    controller.start().context("startup")?;

    // ── 7. Main loop ──────────────────────────────────────────
    let outcome = controller.run(&poller, &shutdown);
    // Cancel repeats and drive the LED off whether the loop ended by
    // request or by a dead handle; line release follows via Drop.
    controller.shutdown();
    // Deregister in reverse order of registration, while the controller
    // still holds the descriptors open.
    for fd in registered.iter().rev() {
        if let Err(e) = poller.unregister(*fd) {
            warn!("teardown: {e}");
        }
    }
    outcome.context("main loop")?;

    info!("blinkd exiting");
    Ok(())
}
