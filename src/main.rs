//! Firmware for the Garden-Cam Raspberry Pi power controller.
//!
//! # Overview
//!
//! An STM32L031G6 switches the Pi's supply through a relay:
//! - **Always-on mode** (default): the Pi stays powered
//! - **PIR mode**: each motion rising edge powers the Pi for 60 seconds
//! - **Shutdown command**: the Pi may ask to be powered down (PIR mode only)
//! - **Battery cutoff** (feature `battery-cutoff`): below 5.40 V the relay
//!   opens and the MCU halts until reset
//!
//! # Tasks
//!
//! - **main**: the 50 ms polling loop ([`Supervisor::run`])
//! - **i2c_target_task**: answers the Pi on I2C1 at address 0x08, posting
//!   commands to the loop and returning the battery percentage on reads
//!
//! # Module Organization
//!
//! - [`hardware`] - Pin mappings, peripheral initialization, halt

#![no_std]
#![no_main]

mod hardware;

use embassy_executor::Spawner;
use embassy_stm32::{
    Config,
    i2c::{I2c, MultiMaster, SlaveCommand, SlaveCommandKind},
    mode::Async,
    rcc::{LsConfig, LseConfig, mux::ClockMux},
    time::Hertz,
};
use embassy_time::Instant;
#[cfg(feature = "debug-mode")]
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

use gardencam_power::battery::{BatteryLevel, VoltageMonitor};
use gardencam_power::command::{self, CommandMailbox, FrameBuffer};
use gardencam_power::config::BatteryConfig;
use gardencam_power::motion::MotionSensor;
use gardencam_power::supervisor::Supervisor;

use hardware::{Board, StopForever};

/// Commands from the I2C target task to the control loop.
static COMMANDS: CommandMailbox = CommandMailbox::new();

/// Battery percentage published by the control loop for I2C reads.
static BATTERY: BatteryLevel = BatteryLevel::new();

/// Creates the clock configuration.
///
/// # Clock Settings
///
/// - **MSI**: 2.097 MHz in normal mode, enough for 100 kHz I2C target timing
/// - **HSI16**: 16 MHz in debug mode, keeps the debugger and RTT responsive
/// - **System clock**: MSI or HSI16 (no PLL)
/// - **LSE**: 32.768 kHz external crystal for RTC / time driver
/// - **Voltage scale**: Range 1
fn create_clock_config() -> embassy_stm32::rcc::Config {
    embassy_stm32::rcc::Config {
        #[cfg(feature = "debug-mode")]
        msi: None,
        #[cfg(not(feature = "debug-mode"))]
        msi: Some(embassy_stm32::rcc::MSIRange::RANGE2M),
        hsi: cfg!(feature = "debug-mode"),
        hse: None,
        pll: None,
        #[cfg(feature = "debug-mode")]
        sys: embassy_stm32::rcc::Sysclk::HSI,
        #[cfg(not(feature = "debug-mode"))]
        sys: embassy_stm32::rcc::Sysclk::MSI,
        ahb_pre: embassy_stm32::rcc::AHBPrescaler::DIV1,
        apb1_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        apb2_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        ls: LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz::hz(32768),
                mode: embassy_stm32::rcc::LseMode::Oscillator(embassy_stm32::rcc::LseDrive::Low),
            }),
        },
        voltage_scale: embassy_stm32::rcc::VoltageScale::RANGE1,
        mux: ClockMux::default(),
    }
}

/// Main entry point.
///
/// # Initialization Sequence
///
/// 1. Configure clocks and initialize STM32 peripherals
/// 2. Drive the relay ON (Pi powered from boot)
/// 3. Latch the PIR baseline and take the first battery sample
/// 4. Spawn the I2C target task
/// 5. Enter the control loop
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    config.rcc = create_clock_config();

    let p = embassy_stm32::init(config);

    defmt::info!("=== GardenCam power controller ===");

    #[cfg(feature = "debug-mode")]
    {
        defmt::info!("Waiting 3 seconds for debugger connection...");
        Timer::after_secs(3).await;
    }

    let board = Board::new(p);

    let mut supervisor = Supervisor::start(
        board.relay,
        MotionSensor::new(board.pir),
        VoltageMonitor::new(board.battery_adc, BatteryConfig::REFERENCE),
        StopForever,
        &COMMANDS,
        &BATTERY,
        Instant::now(),
    )
    .await;

    spawner.spawn(i2c_target_task(board.i2c)).unwrap();

    defmt::info!("Entering control loop");
    supervisor.run().await
}

/// Serves the Pi on I2C1.
///
/// Writes are decoded and posted to the control loop; reads return one
/// byte, the last published battery percentage. Bus errors are logged and
/// the task goes back to listening.
#[embassy_executor::task]
async fn i2c_target_task(mut target: I2c<'static, Async, MultiMaster>) {
    let mut frame = FrameBuffer::new();
    loop {
        match target.listen().await {
            Ok(SlaveCommand {
                kind: SlaveCommandKind::Write,
                ..
            }) => match target.respond_to_write(frame.prepare()).await {
                Ok(len) => command::on_receive(&COMMANDS, frame.received(len)),
                Err(e) => defmt::warn!("I2C write failed: {}", e),
            },
            Ok(SlaveCommand {
                kind: SlaveCommandKind::Read,
                ..
            }) => {
                let percent = command::on_request(&BATTERY);
                if let Err(e) = target.respond_to_read(&[percent]).await {
                    defmt::warn!("I2C read failed: {}", e);
                }
            }
            Err(e) => defmt::warn!("I2C listen failed: {}", e),
        }
    }
}
