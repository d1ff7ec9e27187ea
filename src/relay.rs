//! Relay that switches the Pi's supply.
//!
//! The rest of the firmware only ever talks in terms of [`RelayState`]; the
//! physical pin level is derived in exactly one place, from
//! [`RELAY_ON_LEVEL`](crate::config::RELAY_ON_LEVEL).

use core::convert::Infallible;

use embedded_hal::digital::{OutputPin, PinState};

use crate::config::RELAY_ON_LEVEL;

/// Logical relay position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayState {
    /// Contacts closed, Pi powered.
    On,
    /// Contacts open, Pi unpowered.
    Off,
}

impl RelayState {
    /// Pin level that realises this state for the configured polarity.
    pub fn pin_state(self) -> PinState {
        match self {
            RelayState::On => RELAY_ON_LEVEL,
            RelayState::Off => !RELAY_ON_LEVEL,
        }
    }
}

/// Output pin driving the relay coil, together with the last commanded state.
pub struct Relay<P> {
    pin: P,
    state: RelayState,
}

impl<P> Relay<P>
where
    P: OutputPin<Error = Infallible>,
{
    /// Takes ownership of the pin and drives it to `initial`.
    pub fn new(pin: P, initial: RelayState) -> Self {
        let mut relay = Self {
            pin,
            state: initial,
        };
        relay.set(initial);
        relay
    }

    /// Drives the coil to `state`.
    pub fn set(&mut self, state: RelayState) {
        let Ok(()) = self.pin.set_state(state.pin_state());
        self.state = state;
    }

    /// Last commanded state.
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Whether the relay is closed (Pi powered).
    pub fn is_on(&self) -> bool {
        self.state == RelayState::On
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_is_complementary() {
        assert_eq!(RelayState::On.pin_state(), RELAY_ON_LEVEL);
        assert_eq!(RelayState::Off.pin_state(), !RELAY_ON_LEVEL);
        assert_ne!(RelayState::On.pin_state(), RelayState::Off.pin_state());
    }

    #[test]
    fn reference_board_closes_on_high() {
        assert_eq!(RelayState::On.pin_state(), PinState::High);
    }
}
