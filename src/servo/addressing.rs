// Joint addressing for the hexapod servo bus
// Maps (leg index, joint role) to the 1-based actuator bus ID.

use crate::messages::NUM_LEGS;

/// Total joints on the bus: 6 legs x 3 joints, IDs 1..=18.
pub const NUM_JOINTS: usize = NUM_LEGS * 3;

/// The three joints of one leg, hip outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointRole {
    Coxa,
    Femur,
    Tibia,
}

impl JointRole {
    /// Roles in bus order within a leg.
    pub const ALL: [JointRole; 3] = [JointRole::Coxa, JointRole::Femur, JointRole::Tibia];

    /// Offset of this role within a leg's contiguous ID block.
    fn offset(self) -> u8 {
        match self {
            JointRole::Coxa => 1,
            JointRole::Femur => 2,
            JointRole::Tibia => 3,
        }
    }
}

/// Bus ID of one joint. IDs are contiguous per leg: leg 0 owns 1..=3,
/// leg 5 owns 16..=18. This must match how the servos are physically
/// flashed; a mismatch here silently commands the wrong joint.
pub fn actuator_id(leg: usize, role: JointRole) -> u8 {
    debug_assert!(leg < NUM_LEGS, "leg index {} out of range", leg);
    (leg * 3) as u8 + role.offset()
}
