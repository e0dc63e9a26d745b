// Pose command wire format
//
// One UDP datagram carries exactly one full-body pose: a network id byte
// followed by six legs of three little-endian u16 goal positions each,
// then two unused pad bytes. There is no checksum or version field;
// framing and integrity are the transport's problem, which keeps the
// joint-update path minimal.

use thiserror::Error;

/// Fixed wire size of one pose command: an id byte, six 6-byte legs and
/// two trailing pad bytes. The pad bytes are ignored on decode and zeroed
/// on encode.
pub const MESSAGE_LENGTH: usize = 39;

/// Leg count of the mechanism; leg index 0..5 maps to physical position.
pub const NUM_LEGS: usize = 6;

/// Goal positions for the three joints of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LegPose {
    pub coxa: u16,
    pub femur: u16,
    pub tibia: u16,
}

/// One full-body pose command, as received off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseMessage {
    pub network_id: u8,
    pub legs: [LegPose; NUM_LEGS],
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("pose message must be {MESSAGE_LENGTH} bytes, got {0}")]
    Malformed(usize),
}

impl PoseMessage {
    /// Decode a datagram payload. Anything that is not exactly
    /// [`MESSAGE_LENGTH`] bytes is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() != MESSAGE_LENGTH {
            return Err(MessageError::Malformed(bytes.len()));
        }

        let network_id = bytes[0];
        let mut legs = [LegPose::default(); NUM_LEGS];
        for (leg, chunk) in bytes[1..].chunks_exact(6).enumerate() {
            legs[leg] = LegPose {
                coxa: u16::from_le_bytes([chunk[0], chunk[1]]),
                femur: u16::from_le_bytes([chunk[2], chunk[3]]),
                tibia: u16::from_le_bytes([chunk[4], chunk[5]]),
            };
        }

        Ok(Self { network_id, legs })
    }

    /// Encode into the wire layout. Inverse of [`PoseMessage::decode`].
    pub fn encode(&self) -> [u8; MESSAGE_LENGTH] {
        let mut bytes = [0u8; MESSAGE_LENGTH];
        bytes[0] = self.network_id;
        for (leg, chunk) in bytes[1..].chunks_exact_mut(6).enumerate() {
            chunk[0..2].copy_from_slice(&self.legs[leg].coxa.to_le_bytes());
            chunk[2..4].copy_from_slice(&self.legs[leg].femur.to_le_bytes());
            chunk[4..6].copy_from_slice(&self.legs[leg].tibia.to_le_bytes());
        }
        bytes
    }
}
