//! Battery voltage monitoring.
//!
//! The pack is measured through a resistor divider on one ADC channel. Each
//! reading is the truncated mean of [`ADC_OVERSAMPLE`] conversions, turned
//! into pack volts and then into an approximate charge percentage. The
//! percentage is published to a [`BatteryLevel`] so the bus responder can
//! answer reads without touching the monitor.
//!
//! The percentage is a linear approximation, not a calibrated gauge.

use embassy_time::Instant;
use portable_atomic::{AtomicU8, Ordering};

use crate::config::{ADC_OVERSAMPLE, BATTERY_SAMPLE_INTERVAL, BatteryConfig};

/// Source of raw conversions on the battery divider channel.
#[allow(async_fn_in_trait)]
pub trait BatteryAdc {
    /// One conversion, right-aligned.
    async fn read_raw(&mut self) -> u16;
}

/// Latest sampled battery state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryReading {
    /// Charge estimate, always within 0..=100.
    pub percent: u8,
    /// When the sample was taken.
    pub last_sample: Instant,
}

/// Percentage shared between the control loop (writer) and the bus
/// responder (reader).
pub struct BatteryLevel {
    percent: AtomicU8,
}

impl BatteryLevel {
    /// Starts at 0 % until the first sample is published.
    pub const fn new() -> Self {
        Self {
            percent: AtomicU8::new(0),
        }
    }

    /// Stores a new percentage. Called by the control loop only.
    pub fn publish(&self, percent: u8) {
        self.percent.store(percent, Ordering::Release);
    }

    /// Last published percentage.
    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }
}

impl Default for BatteryLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic battery sampler and cutoff detector.
pub struct VoltageMonitor<A> {
    adc: A,
    config: BatteryConfig,
    reading: Option<BatteryReading>,
}

impl<A: BatteryAdc> VoltageMonitor<A> {
    /// Creates a monitor with no sample taken yet.
    ///
    /// # Arguments
    ///
    /// * `adc` - Conversion source on the divider channel
    /// * `config` - Divider, scale and cutoff parameters
    pub fn new(adc: A, config: BatteryConfig) -> Self {
        Self {
            adc,
            config,
            reading: None,
        }
    }

    /// Truncated mean of [`ADC_OVERSAMPLE`] consecutive conversions.
    pub async fn sample(&mut self) -> u16 {
        let mut sum: u32 = 0;
        for _ in 0..ADC_OVERSAMPLE {
            sum += u32::from(self.adc.read_raw().await);
        }
        (sum / ADC_OVERSAMPLE) as u16
    }

    /// Pack voltage for a raw ADC code.
    pub fn to_volts(&self, raw: u16) -> f32 {
        let c = &self.config;
        f32::from(raw) * c.vref / c.adc_full_scale * (c.r1 + c.r2) / c.r2
    }

    /// Charge estimate for a raw ADC code, clamped to 0..=100.
    pub fn to_percent(&self, raw: u16) -> u8 {
        let volts = self.to_volts(raw);
        let percent = (volts - self.config.empty_volts) * 100.0 / self.config.span_volts;
        percent.clamp(0.0, 100.0) as u8
    }

    /// Whether `volts` should trip the terminal cutoff.
    pub fn below_cutoff(&self, volts: f32) -> bool {
        self.config.cutoff_enabled && volts < self.config.cutoff_volts
    }

    /// True when no sample has been taken yet or the sample interval elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.reading {
            None => true,
            Some(reading) => {
                now.saturating_duration_since(reading.last_sample) >= BATTERY_SAMPLE_INTERVAL
            }
        }
    }

    /// Samples the pack, records and publishes the percentage, and returns
    /// the pack voltage for the cutoff check.
    pub async fn refresh(&mut self, now: Instant, level: &BatteryLevel) -> f32 {
        let raw = self.sample().await;
        let volts = self.to_volts(raw);
        let percent = self.to_percent(raw);

        self.reading = Some(BatteryReading {
            percent,
            last_sample: now,
        });
        level.publish(percent);

        #[cfg(feature = "defmt")]
        defmt::debug!("Battery raw={} pct={}", raw, percent);

        volts
    }

    /// Most recent reading, `None` before the first sample.
    pub fn reading(&self) -> Option<BatteryReading> {
        self.reading
    }
}
