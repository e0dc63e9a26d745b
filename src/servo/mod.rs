// Servo bus control for the hexapod
//
// Provides:
// - (leg, joint role) -> actuator bus ID mapping
// - Dynamixel Protocol 2.0 serial implementation
// - High-level driver: one-time setup, pose fan-out, frame writes

pub mod addressing;
mod driver;
pub mod dynamixel;

pub use addressing::{actuator_id, JointRole, NUM_JOINTS};
pub use driver::{ServoDriver, SetupError};
pub use dynamixel::{DynamixelBus, DynamixelError, OperatingMode};

/// Operations the runtime needs from the servo bus. The real bus
/// implements this over serial; tests substitute a recording fake.
pub trait ServoBus {
    fn ping(&mut self, id: u8) -> dynamixel::Result<bool>;
    fn torque_on(&mut self, id: u8) -> dynamixel::Result<()>;
    fn torque_off(&mut self, id: u8) -> dynamixel::Result<()>;
    fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> dynamixel::Result<()>;
    fn set_goal_position(&mut self, id: u8, position: u16) -> dynamixel::Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    // In-memory bus that records every call, with per-servo failure
    // injection. Every attempt is logged, including rejected ones, so
    // tests can assert both write order and retry behavior.

    use super::dynamixel::{DynamixelError, OperatingMode, Result};
    use super::ServoBus;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum BusCall {
        Ping(u8),
        TorqueOn(u8),
        TorqueOff(u8),
        SetMode(u8, OperatingMode),
        Goal(u8, u16),
    }

    pub type CallLog = Arc<Mutex<Vec<BusCall>>>;

    #[derive(Default)]
    pub struct RecordingBus {
        log: CallLog,
        goal_failures: HashMap<u8, u32>,
        torque_off_failures: HashMap<u8, u32>,
    }

    impl RecordingBus {
        pub fn new() -> (Self, CallLog) {
            let bus = Self::default();
            let log = Arc::clone(&bus.log);
            (bus, log)
        }

        /// Make the next `count` goal writes to `id` fail.
        pub fn fail_goal(mut self, id: u8, count: u32) -> Self {
            self.goal_failures.insert(id, count);
            self
        }

        /// Make the next `count` torque-off writes to `id` fail.
        pub fn fail_torque_off(mut self, id: u8, count: u32) -> Self {
            self.torque_off_failures.insert(id, count);
            self
        }

        fn take_failure(failures: &mut HashMap<u8, u32>, id: u8) -> bool {
            match failures.get_mut(&id) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        }

        fn record(&self, call: BusCall) {
            self.log.lock().unwrap().push(call);
        }
    }

    impl ServoBus for RecordingBus {
        fn ping(&mut self, id: u8) -> Result<bool> {
            self.record(BusCall::Ping(id));
            Ok(true)
        }

        fn torque_on(&mut self, id: u8) -> Result<()> {
            self.record(BusCall::TorqueOn(id));
            Ok(())
        }

        fn torque_off(&mut self, id: u8) -> Result<()> {
            self.record(BusCall::TorqueOff(id));
            if Self::take_failure(&mut self.torque_off_failures, id) {
                return Err(DynamixelError::Timeout { id });
            }
            Ok(())
        }

        fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
            self.record(BusCall::SetMode(id, mode));
            Ok(())
        }

        fn set_goal_position(&mut self, id: u8, position: u16) -> Result<()> {
            self.record(BusCall::Goal(id, position));
            if Self::take_failure(&mut self.goal_failures, id) {
                return Err(DynamixelError::Timeout { id });
            }
            Ok(())
        }
    }
}
