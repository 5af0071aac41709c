//! End-to-end controller scenarios under mock ports.
//!
//! The real drivers need sysfs GPIO, timerfd, and epoll; everything the
//! controller does on top of them runs here on the host: press/hold/
//! release sequences, clamping, auto-repeat timing, dead-handle abort,
//! and graceful shutdown.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use blinkd::app::controller::Controller;
use blinkd::app::ports::{ButtonPort, LedPort, PollPort, Source, TimerPort};
use blinkd::config::BlinkConfig;
use blinkd::error::{Error, Result};

// ── Mock ports ────────────────────────────────────────────────

/// Records every level written to the LED.
#[derive(Clone, Default)]
struct MockLed {
    levels: Arc<Mutex<Vec<bool>>>,
}

impl MockLed {
    fn last(&self) -> Option<bool> {
        self.levels.lock().unwrap().last().copied()
    }

    fn writes(&self) -> usize {
        self.levels.lock().unwrap().len()
    }
}

impl LedPort for MockLed {
    fn set_level(&mut self, on: bool) -> Result<()> {
        self.levels.lock().unwrap().push(on);
        Ok(())
    }
}

/// Serves scripted levels, one per readiness event; errors when the
/// script runs dry so a test that under-scripts fails loudly.
#[derive(Clone, Default)]
struct MockButton {
    script: Arc<Mutex<VecDeque<bool>>>,
}

impl MockButton {
    fn push(&self, level: bool) {
        self.script.lock().unwrap().push_back(level);
    }
}

impl ButtonPort for MockButton {
    fn read_level(&mut self) -> Result<bool> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::io("button script exhausted", std::io::Error::other("test")))
    }
}

/// A button whose line has gone bad: every read fails.
#[derive(Clone, Default)]
struct BrokenButton;

impl ButtonPort for BrokenButton {
    fn read_level(&mut self) -> Result<bool> {
        Err(Error::io(
            "button read",
            std::io::Error::other("simulated dead handle"),
        ))
    }
}

/// Records armed periods; always reports one expiration.
#[derive(Default)]
struct MockTimer {
    periods: Mutex<Vec<Duration>>,
}

impl MockTimer {
    fn last_period(&self) -> Option<Duration> {
        self.periods.lock().unwrap().last().copied()
    }
}

impl TimerPort for MockTimer {
    fn set_period(&self, period: Duration) -> Result<()> {
        self.periods.lock().unwrap().push(period);
        Ok(())
    }

    fn take_expirations(&self) -> Result<u64> {
        Ok(1)
    }
}

/// Replays scripted readiness batches; once the script is exhausted it
/// raises the shutdown flag and reports quiet waits, like a signal
/// arriving between events.
struct ScriptedPoller {
    batches: Mutex<VecDeque<Vec<Source>>>,
    shutdown: Arc<AtomicBool>,
}

impl ScriptedPoller {
    fn new(batches: Vec<Vec<Source>>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            shutdown,
        }
    }
}

impl PollPort for ScriptedPoller {
    fn wait(&self, _timeout: Duration) -> Result<Vec<Source>> {
        match self.batches.lock().unwrap().pop_front() {
            Some(batch) => Ok(batch),
            None => {
                self.shutdown.store(true, Ordering::SeqCst);
                Ok(Vec::new())
            }
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────

type TestController<B> = Controller<B, MockLed, MockTimer>;

fn make_controller(
    cfg: &BlinkConfig,
) -> (TestController<MockButton>, MockLed, [MockButton; 3], Arc<MockTimer>) {
    let led = MockLed::default();
    let buttons = [
        MockButton::default(),
        MockButton::default(),
        MockButton::default(),
    ];
    let timer = Arc::new(MockTimer::default());
    let mut ctrl = Controller::new(led.clone(), buttons.clone(), Arc::clone(&timer), cfg);
    ctrl.start().expect("start must succeed under mock ports");
    (ctrl, led, buttons, timer)
}

/// One full press/release cycle on button `idx`, fast enough that
/// auto-repeat never engages.
fn tap(ctrl: &mut TestController<MockButton>, buttons: &[MockButton; 3], idx: usize) {
    buttons[idx].push(true);
    ctrl.dispatch(Source::Button(idx as u8)).unwrap();
    buttons[idx].push(false);
    ctrl.dispatch(Source::Button(idx as u8)).unwrap();
}

/// Config with auto-repeat timing tightened to test scale.
fn fast_repeat_config() -> BlinkConfig {
    BlinkConfig {
        auto_repeat_delay_ms: 50,
        auto_repeat_interval_ms: 25,
        ..BlinkConfig::default()
    }
}

// ── Clamping scenarios ────────────────────────────────────────

#[test]
fn twenty_increases_clamp_at_max_after_sixteen_steps() {
    let cfg = BlinkConfig::default();
    let (mut ctrl, _led, buttons, timer) = make_controller(&cfg);

    for _ in 0..20 {
        tap(&mut ctrl, &buttons, 0);
    }

    assert!((ctrl.current_hz() - 10.0).abs() < f64::EPSILON);
    // Startup arm + 16 effective steps; the 4 clamped taps must not re-arm.
    assert_eq!(timer.periods.lock().unwrap().len(), 17);
    assert_eq!(timer.last_period(), Some(Duration::from_nanos(100_000_000)));
    ctrl.shutdown();
}

#[test]
fn decrease_reaches_floor_in_three_steps_then_noops() {
    let cfg = BlinkConfig::default();
    let (mut ctrl, _led, buttons, _timer) = make_controller(&cfg);

    for expected in [1.5, 1.0, 0.5] {
        tap(&mut ctrl, &buttons, 2);
        assert!((ctrl.current_hz() - expected).abs() < f64::EPSILON);
    }
    tap(&mut ctrl, &buttons, 2);
    assert!((ctrl.current_hz() - 0.5).abs() < f64::EPSILON);
    ctrl.shutdown();
}

#[test]
fn reset_restores_initial_frequency_and_period() {
    let cfg = BlinkConfig::default();
    let (mut ctrl, _led, buttons, timer) = make_controller(&cfg);

    // Drift to 7.0 Hz, then reset.
    for _ in 0..10 {
        tap(&mut ctrl, &buttons, 0);
    }
    assert!((ctrl.current_hz() - 7.0).abs() < f64::EPSILON);

    tap(&mut ctrl, &buttons, 1);
    assert!((ctrl.current_hz() - 2.0).abs() < f64::EPSILON);
    assert_eq!(
        timer.last_period(),
        Some(Duration::from_nanos(1_000_000_000 / 2))
    );
    ctrl.shutdown();
}

// ── Auto-repeat timing ────────────────────────────────────────

#[test]
fn held_button_repeats_until_release() {
    let cfg = fast_repeat_config();
    let (mut ctrl, _led, buttons, _timer) = make_controller(&cfg);

    buttons[0].push(true);
    ctrl.dispatch(Source::Button(0)).unwrap();
    assert!((ctrl.current_hz() - 2.5).abs() < f64::EPSILON);

    // Hold well past the delay; repeats land every 25ms after the first
    // at delay + interval = 75ms.
    thread::sleep(Duration::from_millis(250));

    buttons[0].push(false);
    ctrl.dispatch(Source::Button(0)).unwrap();
    let at_release = ctrl.current_hz();
    assert!(
        at_release > 2.5 + f64::EPSILON,
        "hold past the delay must fire repeats, still at {at_release} Hz"
    );

    // Release cancels the repeat task synchronously; the frequency must
    // not move afterwards.
    thread::sleep(Duration::from_millis(150));
    assert!((ctrl.current_hz() - at_release).abs() < f64::EPSILON);
    ctrl.shutdown();
}

#[test]
fn release_before_delay_fires_no_repeats() {
    let cfg = fast_repeat_config();
    let (mut ctrl, _led, buttons, _timer) = make_controller(&cfg);

    buttons[2].push(true);
    ctrl.dispatch(Source::Button(2)).unwrap();
    // Release inside the 50ms hold delay.
    thread::sleep(Duration::from_millis(15));
    buttons[2].push(false);
    ctrl.dispatch(Source::Button(2)).unwrap();

    thread::sleep(Duration::from_millis(200));
    // Exactly the one press action: 2.0 → 1.5, nothing more.
    assert!((ctrl.current_hz() - 1.5).abs() < f64::EPSILON);
    ctrl.shutdown();
}

#[test]
fn reset_button_never_repeats() {
    let cfg = fast_repeat_config();
    let (mut ctrl, _led, buttons, timer) = make_controller(&cfg);

    buttons[1].push(true);
    ctrl.dispatch(Source::Button(1)).unwrap();
    thread::sleep(Duration::from_millis(200));
    buttons[1].push(false);
    ctrl.dispatch(Source::Button(1)).unwrap();

    // Startup arm + the single reset re-arm.
    assert_eq!(timer.periods.lock().unwrap().len(), 2);
    ctrl.shutdown();
}

// ── Main loop ─────────────────────────────────────────────────

#[test]
fn run_processes_events_and_honours_shutdown() {
    let cfg = BlinkConfig::default();
    let (mut ctrl, led, buttons, _timer) = make_controller(&cfg);

    buttons[0].push(true);
    buttons[0].push(false);
    let shutdown = Arc::new(AtomicBool::new(false));
    let poller = ScriptedPoller::new(
        vec![
            vec![Source::Timer],
            vec![Source::Button(0)],
            vec![Source::Button(0), Source::Timer],
        ],
        Arc::clone(&shutdown),
    );

    ctrl.run(&poller, &shutdown).expect("loop must exit cleanly");
    assert!(shutdown.load(Ordering::SeqCst));
    assert!((ctrl.current_hz() - 2.5).abs() < f64::EPSILON);

    // Shutdown drives the LED to a defined off state.
    ctrl.shutdown();
    assert_eq!(led.last(), Some(false));
}

#[test]
fn run_exits_immediately_when_shutdown_already_raised() {
    let cfg = BlinkConfig::default();
    let (mut ctrl, led, _buttons, _timer) = make_controller(&cfg);

    let shutdown = Arc::new(AtomicBool::new(true));
    let poller = ScriptedPoller::new(vec![vec![Source::Timer]], Arc::clone(&shutdown));

    let writes_before = led.writes();
    ctrl.run(&poller, &shutdown).unwrap();
    // No wait ever happened, so no toggle happened either.
    assert_eq!(led.writes(), writes_before);
}

#[test]
fn persistent_button_failure_aborts_the_loop() {
    let cfg = BlinkConfig::default();
    let led = MockLed::default();
    let buttons = [BrokenButton, BrokenButton, BrokenButton];
    let timer = Arc::new(MockTimer::default());
    let mut ctrl = Controller::new(led, buttons, Arc::clone(&timer), &cfg);
    ctrl.start().unwrap();

    let shutdown = Arc::new(AtomicBool::new(false));
    // More failing events than the loop tolerates per source.
    let poller = ScriptedPoller::new(
        vec![vec![Source::Button(0)]; 8],
        Arc::clone(&shutdown),
    );

    let outcome = ctrl.run(&poller, &shutdown);
    assert!(
        outcome.is_err(),
        "a handle failing every event must eventually abort the loop"
    );
    ctrl.shutdown();
}
