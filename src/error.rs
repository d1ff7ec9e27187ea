/// Why a received command frame was discarded.
///
/// These never reach the bus master; the receive path logs them and drops
/// the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Zero-length write.
    Empty,
    /// Set-mode command without its mode byte.
    MissingPayload,
    /// Leading byte is not a known command.
    UnknownCommand(u8),
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::Empty => f.write_str("empty frame"),
            FrameError::MissingPayload => f.write_str("set-mode frame without payload"),
            FrameError::UnknownCommand(byte) => write!(f, "unknown command byte {byte:#04x}"),
        }
    }
}

impl core::error::Error for FrameError {}
