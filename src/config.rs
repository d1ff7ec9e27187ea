//! Board constants for the Garden-Cam power controller.
//!
//! Everything that depends on wiring or on the battery pack lives here so a
//! board revision only touches this file.

use embassy_time::Duration;
use embedded_hal::digital::PinState;

/// Pin level that closes the relay and powers the Pi.
///
/// This is the only place the relay polarity is defined; see
/// [`RelayState::pin_state`](crate::relay::RelayState::pin_state).
pub const RELAY_ON_LEVEL: PinState = PinState::High;

/// How long the Pi stays powered after a PIR rising edge.
pub const PIR_HOLD: Duration = Duration::from_millis(60_000);

/// Cadence of battery sampling, independent of the control loop.
pub const BATTERY_SAMPLE_INTERVAL: Duration = Duration::from_millis(10_000);

/// Delay between control loop iterations.
pub const LOOP_DELAY: Duration = Duration::from_millis(50);

/// 7-bit I2C target address the Pi talks to.
pub const I2C_ADDRESS: u8 = 0x08;

/// Command byte: set mode, followed by one payload byte (0 = PIR, 1 = always-on).
pub const CMD_SET_MODE: u8 = 0x0D;

/// Command byte: request shutdown, no payload.
pub const CMD_SHUTDOWN: u8 = 0x07;

/// Largest frame the bus handler buffers; extra bytes are drained.
pub const MAX_FRAME_LEN: usize = 8;

/// ADC samples averaged per battery reading.
pub const ADC_OVERSAMPLE: u32 = 8;

/// Battery sensing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryConfig {
    /// ADC reference voltage (V).
    pub vref: f32,
    /// ADC full-scale code (10-bit converter).
    pub adc_full_scale: f32,
    /// Divider high-side resistor (ohms).
    pub r1: f32,
    /// Divider low-side resistor (ohms).
    pub r2: f32,
    /// Pack voltage reported as 0 %.
    pub empty_volts: f32,
    /// Voltage span from 0 % to 100 %.
    pub span_volts: f32,
    /// Below this pack voltage the cutoff trips.
    pub cutoff_volts: f32,
    /// Whether the terminal cutoff path is armed at all.
    pub cutoff_enabled: bool,
}

impl BatteryConfig {
    /// Reference configuration: 5 V ADC, 30k/7.5k divider, 5.40 V cutoff.
    pub const REFERENCE: Self = Self {
        vref: 5.0,
        adc_full_scale: 1023.0,
        r1: 30_000.0,
        r2: 7_500.0,
        empty_volts: 5.5,
        span_volts: 3.3,
        cutoff_volts: 5.40,
        cutoff_enabled: cfg!(feature = "battery-cutoff"),
    };

    /// Same thresholds with the cutoff explicitly armed or disarmed.
    pub const fn with_cutoff(self, enabled: bool) -> Self {
        Self {
            cutoff_enabled: enabled,
            ..self
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}
