#![allow(dead_code)]

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_futures::block_on;
use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use gardencam_power::battery::{BatteryAdc, BatteryLevel, VoltageMonitor};
use gardencam_power::command::CommandMailbox;
use gardencam_power::config::BatteryConfig;
use gardencam_power::motion::MotionSensor;
use gardencam_power::{Halt, Supervisor};

/// ADC code for a healthy pack (~7.3 V, 55 %).
pub const HEALTHY_RAW: u16 = 300;
/// ADC code below the 5.40 V cutoff (~4.9 V).
pub const FLAT_RAW: u16 = 200;

/// Relay output whose level the test can observe.
#[derive(Clone, Default)]
pub struct MockRelayPin {
    high: Rc<Cell<bool>>,
}

impl MockRelayPin {
    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

impl ErrorType for MockRelayPin {
    type Error = Infallible;
}

impl OutputPin for MockRelayPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high.set(true);
        Ok(())
    }
}

/// PIR input the test drives.
#[derive(Clone, Default)]
pub struct MockPirPin {
    level: Rc<Cell<bool>>,
}

impl MockPirPin {
    pub fn set(&self, motion: bool) {
        self.level.set(motion);
    }
}

impl ErrorType for MockPirPin {
    type Error = Infallible;
}

impl InputPin for MockPirPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

/// ADC returning whatever code the test last set, counting conversions.
#[derive(Clone)]
pub struct MockAdc {
    code: Rc<Cell<u16>>,
    conversions: Rc<Cell<u32>>,
}

impl MockAdc {
    pub fn new(code: u16) -> Self {
        Self {
            code: Rc::new(Cell::new(code)),
            conversions: Rc::new(Cell::new(0)),
        }
    }

    pub fn set(&self, code: u16) {
        self.code.set(code);
    }

    pub fn conversions(&self) -> u32 {
        self.conversions.get()
    }
}

impl BatteryAdc for MockAdc {
    async fn read_raw(&mut self) -> u16 {
        self.conversions.set(self.conversions.get() + 1);
        self.code.get()
    }
}

/// Halts by unwinding so tests can observe the state left behind.
pub struct PanicHalt;

impl Halt for PanicHalt {
    fn halt(&mut self) -> ! {
        panic!("halted");
    }
}

pub fn ms(t: u64) -> Instant {
    Instant::from_millis(t)
}

pub fn armed() -> BatteryConfig {
    BatteryConfig::REFERENCE.with_cutoff(true)
}

/// Handles onto the mocks behind a supervisor.
pub struct Rig {
    pub relay: MockRelayPin,
    pub pir: MockPirPin,
    pub adc: MockAdc,
}

pub type TestSupervisor<'a> = Supervisor<'a, MockRelayPin, MockPirPin, MockAdc, PanicHalt>;

impl Rig {
    pub fn new(raw: u16) -> Self {
        Self {
            relay: MockRelayPin::default(),
            pir: MockPirPin::default(),
            adc: MockAdc::new(raw),
        }
    }

    /// Boots a supervisor at t = 0.
    pub fn boot<'a>(
        &self,
        config: BatteryConfig,
        mailbox: &'a CommandMailbox,
        level: &'a BatteryLevel,
    ) -> TestSupervisor<'a> {
        block_on(Supervisor::start(
            self.relay.clone(),
            MotionSensor::new(self.pir.clone()),
            VoltageMonitor::new(self.adc.clone(), config),
            PanicHalt,
            mailbox,
            level,
            ms(0),
        ))
    }
}
