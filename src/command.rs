//! Commands from the Pi over the I2C target interface.
//!
//! The bus handler runs outside the control loop. It never touches the
//! power state directly: it parses the frame and posts a [`Command`] to a
//! [`CommandMailbox`], which the control loop drains once per cycle. Reads are answered
//! from the published [`BatteryLevel`] only.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, Ordering};

use crate::battery::BatteryLevel;
use crate::config::{CMD_SET_MODE, CMD_SHUTDOWN, MAX_FRAME_LEN};
use crate::error::FrameError;
use crate::power::Mode;

/// A decoded command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `0x0D <mode>`: 0 selects PIR mode, anything else always-on.
    SetMode(Mode),
    /// `0x07`: power the Pi down (honoured in PIR mode only).
    RequestShutdown,
}

impl Command {
    /// Decodes a frame. Bytes past the ones a command needs are ignored.
    ///
    /// # Arguments
    ///
    /// * `frame` - Bytes written by the bus master, command byte first
    pub fn parse(frame: &[u8]) -> Result<Self, FrameError> {
        let (&cmd, rest) = frame.split_first().ok_or(FrameError::Empty)?;
        match cmd {
            CMD_SET_MODE => {
                let &mode = rest.first().ok_or(FrameError::MissingPayload)?;
                let mode = if mode != 0 {
                    Mode::AlwaysOn
                } else {
                    Mode::PirTriggered
                };
                Ok(Command::SetMode(mode))
            }
            CMD_SHUTDOWN => Ok(Command::RequestShutdown),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }
}

/// Hand-off from the bus handler to the control loop.
///
/// Holds at most one pending mode (the latest one written wins) and one
/// pending shutdown flag, so no burst of frames can displace a command.
/// The handler only stores; the loop takes both once per cycle.
pub struct CommandMailbox {
    mode: Signal<CriticalSectionRawMutex, Mode>,
    shutdown: AtomicBool,
}

impl CommandMailbox {
    /// Empty mailbox: no mode, no shutdown.
    pub const fn new() -> Self {
        Self {
            mode: Signal::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Records `command`, overwriting any mode not yet taken by the loop.
    ///
    /// # Arguments
    ///
    /// * `command` - Decoded command from the bus handler
    pub fn post(&self, command: Command) {
        match command {
            Command::SetMode(mode) => self.mode.signal(mode),
            Command::RequestShutdown => self.shutdown.store(true, Ordering::Release),
        }
    }

    /// Latest mode written since the previous call, if any.
    pub fn take_mode(&self) -> Option<Mode> {
        self.mode.try_take()
    }

    /// Whether a shutdown was requested since the previous call.
    pub fn take_shutdown(&self) -> bool {
        self.shutdown.swap(false, Ordering::AcqRel)
    }
}

impl Default for CommandMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive buffer for one bus write.
pub struct FrameBuffer {
    bytes: [u8; MAX_FRAME_LEN],
}

impl FrameBuffer {
    /// Zeroed buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_FRAME_LEN],
        }
    }

    /// Zeroes the buffer and hands it to the bus driver for the next write.
    pub fn prepare(&mut self) -> &mut [u8] {
        self.bytes.fill(0);
        &mut self.bytes
    }

    /// The first `len` bytes of the last write, clamped to capacity.
    pub fn received(&self, len: usize) -> &[u8] {
        &self.bytes[..len.min(MAX_FRAME_LEN)]
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive handler: decode `frame` and post the command.
///
/// Malformed frames are logged and dropped; nothing is reported back to the
/// bus master.
///
/// # Arguments
///
/// * `mailbox` - Mailbox drained by the control loop
/// * `frame` - Bytes written by the bus master, command byte first
pub fn on_receive(mailbox: &CommandMailbox, frame: &[u8]) {
    match Command::parse(frame) {
        Ok(command) => mailbox.post(command),
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::debug!("Discarding frame ({} bytes): {}", frame.len(), _err);
        }
    }
}

/// Request handler: the single byte returned to a bus read.
///
/// # Arguments
///
/// * `level` - Percentage last published by the control loop
pub fn on_request(level: &BatteryLevel) -> u8 {
    level.percent()
}
