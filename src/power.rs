//! Relay power state machine.
//!
//! [`PowerController`] owns the relay and decides, every cycle, whether the
//! Pi is powered. It arbitrates four inputs:
//!
//! - mode changes from the Pi (always-on vs. PIR-triggered),
//! - PIR rising edges, which (re)start a 60 s hold window,
//! - expiry of that hold window,
//! - shutdown requests from the Pi.
//!
//! A fifth input, the battery cutoff, is terminal: [`PowerController::cut_off`]
//! opens the relay, latches, and never returns.
//!
//! # Mode semantics
//!
//! | Mode           | On entry       | PIR edge        | Timeout | Shutdown request |
//! |----------------|----------------|-----------------|---------|------------------|
//! | `AlwaysOn`     | relay ON       | ignored         | ignored | kept pending, ignored |
//! | `PirTriggered` | relay OFF      | ON, timer reset | OFF     | OFF, cleared     |

use core::convert::Infallible;

use embassy_time::Instant;
use embedded_hal::digital::OutputPin;

use crate::config::PIR_HOLD;
use crate::relay::{Relay, RelayState};

/// Operating mode selected by the Pi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Pi powered continuously.
    #[default]
    AlwaysOn,
    /// Pi powered for a hold window after each motion edge.
    PirTriggered,
}

/// Terminal low-power state with no wake source other than reset.
///
/// Implementations must leave the relay output as it was (the controller
/// opens it before calling) and must not return.
pub trait Halt {
    /// Enters the terminal state.
    fn halt(&mut self) -> !;
}

/// Owner of the relay and of every piece of power-decision state.
pub struct PowerController<P> {
    relay: Relay<P>,
    mode: Mode,
    /// Time of the last OFF -> ON (or re-arming) transition.
    powered_since: Instant,
    shutdown_requested: bool,
    cut_off: bool,
}

impl<P> PowerController<P>
where
    P: OutputPin<Error = Infallible>,
{
    /// Boot state: always-on, relay closed, hold timer started at `now`.
    ///
    /// # Arguments
    ///
    /// * `relay_pin` - Relay coil output; driven ON before this returns
    /// * `now` - Boot time, the start of the first hold window
    pub fn new(relay_pin: P, now: Instant) -> Self {
        Self {
            relay: Relay::new(relay_pin, RelayState::On),
            mode: Mode::AlwaysOn,
            powered_since: now,
            shutdown_requested: false,
            cut_off: false,
        }
    }

    /// Switches mode and immediately re-asserts the relay for the new mode.
    ///
    /// Re-selecting the current mode is a no-op: neither the relay nor the
    /// hold timer is touched.
    ///
    /// # Arguments
    ///
    /// * `mode` - Mode requested by the Pi
    /// * `now` - Current time, the new hold start when switching to always-on
    pub fn apply_mode(&mut self, mode: Mode, now: Instant) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;

        match mode {
            Mode::AlwaysOn => {
                #[cfg(feature = "defmt")]
                defmt::info!("Mode: always-on -> relay ON (Pi ON)");
                self.power_on(now);
            }
            Mode::PirTriggered => {
                #[cfg(feature = "defmt")]
                defmt::info!("Mode: PIR -> relay OFF (Pi OFF)");
                self.power_off();
            }
        }
    }

    /// PIR LOW -> HIGH. Powers the Pi and restarts the hold window, even if
    /// it is already on. Only meaningful in PIR mode.
    pub fn on_motion_rising(&mut self, now: Instant) {
        if self.mode != Mode::PirTriggered {
            return;
        }
        #[cfg(feature = "defmt")]
        defmt::info!("PIR rising -> relay ON ({} s)", PIR_HOLD.as_secs());
        self.power_on(now);
    }

    /// Per-cycle timer and shutdown evaluation.
    ///
    /// The hold timeout is checked before the shutdown request; both may
    /// open the relay in the same cycle.
    pub fn on_tick(&mut self, now: Instant) {
        if self.mode != Mode::PirTriggered {
            return;
        }

        if self.relay.is_on()
            && now.saturating_duration_since(self.powered_since) >= PIR_HOLD
        {
            #[cfg(feature = "defmt")]
            defmt::info!("{} s elapsed -> relay OFF", PIR_HOLD.as_secs());
            self.power_off();
        }

        if self.shutdown_requested {
            #[cfg(feature = "defmt")]
            defmt::info!("Shutdown request -> relay OFF");
            self.power_off();
            self.shutdown_requested = false;
        }
    }

    /// Marks a shutdown as requested.
    ///
    /// In always-on mode the request stays pending and has no effect until
    /// the mode changes; always-on overrides remote shutdown.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Opens the relay, latches the cutoff and enters `halt`. Never returns.
    pub fn cut_off<H: Halt>(&mut self, halt: &mut H) -> ! {
        #[cfg(feature = "defmt")]
        defmt::error!("Battery below cutoff -> relay OFF + deep sleep");
        self.cut_off = true;
        self.power_off();
        halt.halt()
    }

    /// Current operating mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Last commanded relay position.
    pub fn relay_state(&self) -> RelayState {
        self.relay.state()
    }

    /// Start of the current hold window (last ON transition or re-arm).
    pub fn powered_since(&self) -> Instant {
        self.powered_since
    }

    /// Whether a shutdown request is waiting to be honoured.
    pub fn shutdown_pending(&self) -> bool {
        self.shutdown_requested
    }

    /// Whether the battery cutoff has latched.
    pub fn is_cut_off(&self) -> bool {
        self.cut_off
    }

    fn power_on(&mut self, now: Instant) {
        if self.cut_off {
            return;
        }
        self.relay.set(RelayState::On);
        self.powered_since = now;
    }

    fn power_off(&mut self) {
        self.relay.set(RelayState::Off);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Output pin with no backing hardware; state is checked via `relay_state`.
    #[derive(Default)]
    struct LevelPin;

    impl embedded_hal::digital::ErrorType for LevelPin {
        type Error = Infallible;
    }

    impl OutputPin for LevelPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    fn ms(t: u64) -> Instant {
        Instant::from_millis(t)
    }

    fn pir_controller(t: u64) -> PowerController<LevelPin> {
        let mut pc = PowerController::new(LevelPin::default(), ms(0));
        pc.apply_mode(Mode::PirTriggered, ms(t));
        pc
    }

    #[test]
    fn boots_always_on() {
        let pc = PowerController::new(LevelPin::default(), ms(5));
        assert_eq!(pc.mode(), Mode::AlwaysOn);
        assert_eq!(pc.relay_state(), RelayState::On);
        assert_eq!(pc.powered_since(), ms(5));
        assert!(!pc.shutdown_pending());
    }

    #[test]
    fn reapplying_current_mode_changes_nothing() {
        let mut pc = PowerController::new(LevelPin::default(), ms(0));
        pc.apply_mode(Mode::AlwaysOn, ms(1_000));
        assert_eq!(pc.relay_state(), RelayState::On);
        assert_eq!(pc.powered_since(), ms(0));

        let mut pc = pir_controller(0);
        pc.on_motion_rising(ms(100));
        pc.apply_mode(Mode::PirTriggered, ms(200));
        assert_eq!(pc.relay_state(), RelayState::On);
        assert_eq!(pc.powered_since(), ms(100));
    }

    #[test]
    fn mode_switch_forces_relay() {
        let mut pc = pir_controller(10);
        assert_eq!(pc.relay_state(), RelayState::Off);

        pc.apply_mode(Mode::AlwaysOn, ms(500));
        assert_eq!(pc.relay_state(), RelayState::On);
        assert_eq!(pc.powered_since(), ms(500));

        pc.apply_mode(Mode::PirTriggered, ms(600));
        assert_eq!(pc.relay_state(), RelayState::Off);
    }

    #[test]
    fn motion_rearms_hold_window() {
        let mut pc = pir_controller(0);
        pc.on_motion_rising(ms(1_000));
        pc.on_motion_rising(ms(30_000));
        assert_eq!(pc.powered_since(), ms(30_000));

        pc.on_tick(ms(61_000));
        assert_eq!(pc.relay_state(), RelayState::On);
        pc.on_tick(ms(90_000));
        assert_eq!(pc.relay_state(), RelayState::Off);
    }

    #[test]
    fn motion_ignored_when_always_on() {
        let mut pc = PowerController::new(LevelPin::default(), ms(0));
        pc.on_motion_rising(ms(2_000));
        assert_eq!(pc.powered_since(), ms(0));
    }

    #[test]
    fn hold_timeout_boundary() {
        let t0 = 7_000;
        let mut pc = pir_controller(0);
        pc.on_motion_rising(ms(t0));

        pc.on_tick(ms(t0 + 59_999));
        assert_eq!(pc.relay_state(), RelayState::On);

        pc.on_tick(ms(t0 + 60_000));
        assert_eq!(pc.relay_state(), RelayState::Off);
    }

    #[test]
    fn always_on_never_times_out() {
        let mut pc = PowerController::new(LevelPin::default(), ms(0));
        pc.on_tick(ms(3_600_000));
        assert_eq!(pc.relay_state(), RelayState::On);
    }

    #[test]
    fn shutdown_ignored_but_kept_in_always_on() {
        let mut pc = PowerController::new(LevelPin::default(), ms(0));
        pc.request_shutdown();
        pc.on_tick(ms(100));
        pc.on_tick(ms(150));
        assert_eq!(pc.relay_state(), RelayState::On);
        assert!(pc.shutdown_pending());
    }

    #[test]
    fn shutdown_honoured_in_pir_mode() {
        let mut pc = pir_controller(0);
        pc.on_motion_rising(ms(100));
        pc.request_shutdown();
        pc.on_tick(ms(200));
        assert_eq!(pc.relay_state(), RelayState::Off);
        assert!(!pc.shutdown_pending());
    }

    #[test]
    fn pending_shutdown_fires_after_switch_to_pir() {
        let mut pc = PowerController::new(LevelPin::default(), ms(0));
        pc.request_shutdown();
        pc.on_tick(ms(50));
        pc.apply_mode(Mode::PirTriggered, ms(100));
        pc.on_motion_rising(ms(120));
        pc.on_tick(ms(150));
        assert_eq!(pc.relay_state(), RelayState::Off);
        assert!(!pc.shutdown_pending());
    }
}
