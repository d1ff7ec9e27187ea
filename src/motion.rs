//! PIR motion input.
//!
//! The sensor itself is stateless: it reports the current level and nothing
//! else. Edges are derived by the caller from the previous cycle's reading.

use core::convert::Infallible;

use embedded_hal::digital::InputPin;

/// Transition observed between two consecutive PIR readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionEdge {
    /// LOW -> HIGH, motion just started.
    Rising,
    /// HIGH -> LOW.
    Falling,
    /// Level unchanged.
    Steady,
}

impl MotionEdge {
    /// Edge between the previous and the current PIR level.
    ///
    /// # Arguments
    ///
    /// * `previous` - Level read on the last cycle
    /// * `current` - Level read on this cycle
    pub fn between(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => MotionEdge::Rising,
            (true, false) => MotionEdge::Falling,
            _ => MotionEdge::Steady,
        }
    }
}

/// PIR sensor wired to a pulled-up input; HIGH means motion present.
pub struct MotionSensor<I> {
    pin: I,
}

impl<I> MotionSensor<I>
where
    I: InputPin<Error = Infallible>,
{
    /// Wraps the PIR input pin.
    pub fn new(pin: I) -> Self {
        Self { pin }
    }

    /// Current motion level.
    pub fn read(&mut self) -> bool {
        let Ok(high) = self.pin.is_high();
        high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_low_to_high_is_rising() {
        assert_eq!(MotionEdge::between(false, true), MotionEdge::Rising);
        assert_eq!(MotionEdge::between(true, true), MotionEdge::Steady);
        assert_eq!(MotionEdge::between(false, false), MotionEdge::Steady);
        assert_eq!(MotionEdge::between(true, false), MotionEdge::Falling);
    }
}
