//! Hardware abstraction and peripheral initialization.
//!
//! This module defines the pin mappings and peripheral initialization
//! for the Garden-Cam power controller board.
//!
//! # Pin Assignments
//!
//! ## Power
//! - **PB1**: RELAY - Relay coil driver, HIGH = Pi powered
//! - **PA1**: VBAT_SENSE - Battery divider (30k / 7.5k), ADC_IN1
//!
//! ## Sensors
//! - **PA0**: PIR - Motion sensor output, pulled up, HIGH = motion
//!
//! ## Pi link (I2C1 target, address 0x08)
//! - **PA9**: SCL
//! - **PA10**: SDA
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK

use embassy_stm32::adc::{self, Adc, AdcChannel, AnyAdcChannel, Resolution};
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c, MultiMaster, SlaveAddrConfig};
use embassy_stm32::mode::Async;
use embassy_stm32::peripherals::{ADC1, I2C1};
use embassy_stm32::{bind_interrupts, pac};
use embedded_hal::digital::PinState;

use gardencam_power::battery::BatteryAdc;
use gardencam_power::config::I2C_ADDRESS;
use gardencam_power::{Halt, RelayState};

bind_interrupts!(pub struct Irqs {
    ADC1_COMP => adc::InterruptHandler<ADC1>;
    I2C1 => i2c::EventInterruptHandler<I2C1>, i2c::ErrorInterruptHandler<I2C1>;
});

/// Top-level peripheral container for the power controller.
///
/// Owns every pin and peripheral the firmware uses, ready to be handed to
/// the supervisor and the I2C target task.
pub struct Board {
    /// Relay coil output, already driven to the boot state (Pi ON)
    pub relay: Output<'static>,
    /// PIR motion input
    pub pir: Input<'static>,
    /// ADC bound to the battery divider
    pub battery_adc: BoardAdc,
    /// I2C1 in target mode at [`I2C_ADDRESS`]
    pub i2c: I2c<'static, Async, MultiMaster>,
}

impl Board {
    /// Initializes all peripherals from the STM32 peripheral singleton.
    ///
    /// The relay pin is driven to the ON level immediately so the Pi
    /// receives power as soon as the controller starts.
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        let relay_level = match RelayState::On.pin_state() {
            PinState::High => Level::High,
            PinState::Low => Level::Low,
        };

        let mut adc = Adc::new(p.ADC1, Irqs);
        adc.set_resolution(Resolution::BITS10);

        let i2c = I2c::new(
            p.I2C1,
            p.PA9,
            p.PA10,
            Irqs,
            p.DMA1_CH2,
            p.DMA1_CH3,
            i2c::Config::default(),
        )
        .into_slave_multimaster(SlaveAddrConfig::basic(I2C_ADDRESS));

        Self {
            relay: Output::new(p.PB1, relay_level, Speed::Low),
            pir: Input::new(p.PA0, Pull::Up),
            battery_adc: BoardAdc {
                adc,
                channel: p.PA1.degrade_adc(),
            },
            i2c,
        }
    }
}

/// ADC plus the battery divider channel.
pub struct BoardAdc {
    adc: Adc<'static, ADC1>,
    channel: AnyAdcChannel<ADC1>,
}

impl BatteryAdc for BoardAdc {
    async fn read_raw(&mut self) -> u16 {
        self.adc.read(&mut self.channel).await
    }
}

/// STOP mode with interrupts masked: the relay output is retained and
/// nothing but a reset brings the controller back.
pub struct StopForever;

impl Halt for StopForever {
    fn halt(&mut self) -> ! {
        cortex_m::interrupt::disable();

        // The executor is never resumed, so stealing the core peripherals
        // cannot alias a live owner.
        let mut core = unsafe { cortex_m::Peripherals::steal() };
        core.SCB.set_sleepdeep();
        pac::PWR
            .cr()
            .modify(|w| w.set_pdds(pac::pwr::vals::Pdds::STOP_MODE));

        loop {
            cortex_m::asm::wfi();
        }
    }
}
