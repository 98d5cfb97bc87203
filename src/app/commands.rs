//! Inbound peer commands.
//!
//! A peer controls the device by writing a single byte to the
//! [`Command`](super::ports::CharacteristicId::Command) characteristic.
//! Anything that doesn't decode is ignored: the protocol has no error
//! channel, so a malformed request simply gets no answer.

use super::ports::CharacteristicId;

/// Commands a connected peer can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerCommand {
    /// Push the latest battery reading once.
    BatteryQuery,
    /// Push the latest temperature reading once.
    TemperatureQuery,
    /// Subscribe the writer to the per-tick keep-alive push.
    EnableNotifications,
}

impl PeerCommand {
    pub fn opcode(self) -> u8 {
        match self {
            Self::BatteryQuery => 0x01,
            Self::TemperatureQuery => 0x02,
            Self::EnableNotifications => 0x03,
        }
    }

    /// Decode a write.  Only single-byte writes to the command channel
    /// carry a command.
    pub fn parse(characteristic: CharacteristicId, data: &[u8]) -> Option<Self> {
        if characteristic != CharacteristicId::Command {
            return None;
        }
        match data {
            [0x01] => Some(Self::BatteryQuery),
            [0x02] => Some(Self::TemperatureQuery),
            [0x03] => Some(Self::EnableNotifications),
            _ => None,
        }
    }
}
