//! Power controller for the Garden-Cam Raspberry Pi.
//!
//! # Overview
//!
//! A small microcontroller sits between the battery and the Pi and switches
//! the Pi's supply through a relay. It decides when the Pi is powered from:
//! - the operating mode selected by the Pi (always-on or PIR-triggered),
//! - a PIR motion sensor (60 s of power per rising edge in PIR mode),
//! - shutdown requests from the Pi,
//! - an optional battery-voltage cutoff that halts the controller for good.
//!
//! The Pi talks to the controller as an I2C target at address `0x08`: it
//! writes mode/shutdown commands and reads back the battery percentage.
//!
//! # Module Organization
//!
//! - [`power`] - Relay power state machine
//! - [`supervisor`] - Polling loop tying sensors, commands and the state machine together
//! - [`battery`] - Battery sampling, percentage and cutoff detection
//! - [`command`] - Command frame decoding and the hand-off mailbox
//! - [`motion`] - PIR input and edge derivation
//! - [`relay`] - Relay output and its polarity
//! - [`config`] - Board constants
//!
//! Everything here is hardware-independent and builds on the host; the
//! firmware binary supplies embassy-stm32 pins, ADC and I2C.

#![cfg_attr(not(test), no_std)]

pub mod battery;
pub mod command;
pub mod config;
pub mod error;
pub mod motion;
pub mod power;
pub mod relay;
pub mod supervisor;

pub use command::{Command, CommandMailbox};
pub use error::FrameError;
pub use power::{Halt, Mode, PowerController};
pub use relay::RelayState;
pub use supervisor::Supervisor;
