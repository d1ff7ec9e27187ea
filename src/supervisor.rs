//! The control loop.
//!
//! One [`Supervisor::step`] is one pass of the polling loop:
//!
//! 1. take the mode and shutdown request posted by the bus handler,
//! 2. sample the battery if the sample interval elapsed (may halt),
//! 3. read the PIR and fire on a rising edge,
//! 4. evaluate the hold timeout and any pending shutdown.

use core::convert::Infallible;

use embassy_time::{Instant, Timer};
use embedded_hal::digital::{InputPin, OutputPin};

use crate::battery::{BatteryAdc, BatteryLevel, VoltageMonitor};
use crate::command::CommandMailbox;
use crate::config::LOOP_DELAY;
use crate::motion::{MotionEdge, MotionSensor};
use crate::power::{Halt, PowerController};

/// The polling loop and everything it owns.
///
/// Holds the [`PowerController`] (and through it the relay), the PIR
/// sensor, the battery monitor and the halt used on cutoff. The bus handler
/// reaches it only through the shared [`CommandMailbox`] and
/// [`BatteryLevel`].
pub struct Supervisor<'a, R, M, A, H> {
    power: PowerController<R>,
    motion: MotionSensor<M>,
    battery: VoltageMonitor<A>,
    halt: H,
    commands: &'a CommandMailbox,
    level: &'a BatteryLevel,
    /// PIR level seen on the previous cycle.
    last_motion: bool,
}

impl<'a, R, M, A, H> Supervisor<'a, R, M, A, H>
where
    R: OutputPin<Error = Infallible>,
    M: InputPin<Error = Infallible>,
    A: BatteryAdc,
    H: Halt,
{
    /// Boot sequence: relay closed, PIR baseline latched, first battery
    /// sample published (and checked against the cutoff).
    ///
    /// # Arguments
    ///
    /// * `relay_pin` - Relay coil output, driven ON immediately
    /// * `motion` - PIR sensor
    /// * `battery` - Battery monitor
    /// * `halt` - Terminal state entered if the battery is below cutoff
    /// * `commands` - Mailbox written by the bus handler
    /// * `level` - Battery percentage read by the bus handler
    /// * `now` - Boot time
    pub async fn start(
        relay_pin: R,
        mut motion: MotionSensor<M>,
        battery: VoltageMonitor<A>,
        halt: H,
        commands: &'a CommandMailbox,
        level: &'a BatteryLevel,
        now: Instant,
    ) -> Self {
        let power = PowerController::new(relay_pin, now);
        let last_motion = motion.read();

        let mut supervisor = Self {
            power,
            motion,
            battery,
            halt,
            commands,
            level,
            last_motion,
        };
        supervisor.sample_battery(now).await;
        supervisor
    }

    /// One pass of the control loop at time `now`.
    pub async fn step(&mut self, now: Instant) {
        if let Some(mode) = self.commands.take_mode() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Set mode {}", mode);
            self.power.apply_mode(mode, now);
        }
        if self.commands.take_shutdown() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Shutdown requested");
            self.power.request_shutdown();
        }

        if self.battery.is_due(now) {
            self.sample_battery(now).await;
        }

        let motion = self.motion.read();
        if MotionEdge::between(self.last_motion, motion) == MotionEdge::Rising {
            self.power.on_motion_rising(now);
        }
        self.last_motion = motion;

        self.power.on_tick(now);
    }

    /// Runs the loop forever at [`LOOP_DELAY`] cadence.
    pub async fn run(&mut self) -> ! {
        loop {
            self.step(Instant::now()).await;
            Timer::after(LOOP_DELAY).await;
        }
    }

    /// State machine, for diagnostics.
    pub fn power(&self) -> &PowerController<R> {
        &self.power
    }

    /// Battery monitor, for diagnostics.
    pub fn battery(&self) -> &VoltageMonitor<A> {
        &self.battery
    }

    async fn sample_battery(&mut self, now: Instant) {
        let volts = self.battery.refresh(now, self.level).await;
        if self.battery.below_cutoff(volts) {
            self.power.cut_off(&mut self.halt);
        }
    }
}
