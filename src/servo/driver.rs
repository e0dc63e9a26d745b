// High-level servo driver for the hexapod
//
// Wraps the bus with the three operations the runtime performs: one-time
// configuration of all joints, fan-out of a live pose command, and a
// single motion primitive frame write.

use std::thread;
use tracing::{debug, info, warn};

use super::addressing::{actuator_id, JointRole, NUM_JOINTS};
use super::dynamixel::{self, DynamixelError, OperatingMode};
use super::ServoBus;
use crate::config::{FRAME_WRITE_RETRIES, SETUP_RETRY_BACKOFF, SETUP_RETRY_LIMIT};
use crate::messages::PoseMessage;

/// A servo that never acknowledged one of its configuration steps.
#[derive(Debug, thiserror::Error)]
#[error("servo {id} did not acknowledge {step} after {SETUP_RETRY_LIMIT} attempts")]
pub struct SetupError {
    pub id: u8,
    pub step: &'static str,
    #[source]
    pub source: DynamixelError,
}

/// High-level driver owning the servo bus.
pub struct ServoDriver<B: ServoBus> {
    bus: B,
}

impl<B: ServoBus> ServoDriver<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Configure every joint for position control: ping, torque off, set
    /// position mode, torque on, in bus ID order. Each step is retried a
    /// bounded number of times with backoff before startup is abandoned.
    pub fn initialize(&mut self) -> Result<(), SetupError> {
        info!("Configuring servos 1..={} for position control", NUM_JOINTS);

        for id in 1..=NUM_JOINTS as u8 {
            debug!("Configuring servo {}", id);
            self.retry(id, "ping", |bus| match bus.ping(id) {
                Ok(true) => Ok(()),
                Ok(false) => Err(DynamixelError::Timeout { id }),
                Err(e) => Err(e),
            })?;
            // Torque must be off while the operating mode is changed
            self.retry(id, "torque off", |bus| bus.torque_off(id))?;
            self.retry(id, "position mode", |bus| {
                bus.set_operating_mode(id, OperatingMode::Position)
            })?;
            self.retry(id, "torque on", |bus| bus.torque_on(id))?;
        }

        info!("All servos configured");
        Ok(())
    }

    fn retry<F>(&mut self, id: u8, step: &'static str, mut op: F) -> Result<(), SetupError>
    where
        F: FnMut(&mut B) -> dynamixel::Result<()>,
    {
        let mut attempt = 0;
        loop {
            match op(&mut self.bus) {
                Ok(()) => return Ok(()),
                Err(source) => {
                    attempt += 1;
                    if attempt >= SETUP_RETRY_LIMIT {
                        return Err(SetupError { id, step, source });
                    }
                    debug!("Servo {} {} attempt {} failed, retrying", id, step, attempt);
                    thread::sleep(SETUP_RETRY_BACKOFF);
                }
            }
        }
    }

    /// Write one live pose: 18 goal positions in leg order, coxa, femur,
    /// tibia within each leg. Writes are fire-and-forget; a failed joint
    /// is logged and the rest of the pose still goes out.
    pub fn apply_pose(&mut self, msg: &PoseMessage) {
        for (leg, pose) in msg.legs.iter().enumerate() {
            let joints = [
                (JointRole::Coxa, pose.coxa),
                (JointRole::Femur, pose.femur),
                (JointRole::Tibia, pose.tibia),
            ];
            for (role, position) in joints {
                let id = actuator_id(leg, role);
                if let Err(e) = self.bus.set_goal_position(id, position) {
                    warn!("Goal write to servo {} failed: {}", id, e);
                }
            }
        }
    }

    /// Write one primitive frame: 18 goal positions already in bus ID
    /// order. Unlike live poses, every joint write is retried until
    /// accepted, bounded so a wedged servo cannot stall playback; on
    /// exhaustion the rest of the frame is abandoned.
    pub fn apply_frame(&mut self, frame: &[u16; NUM_JOINTS]) -> dynamixel::Result<()> {
        for (slot, &position) in frame.iter().enumerate() {
            let id = (slot + 1) as u8;
            let mut attempt = 0;
            loop {
                match self.bus.set_goal_position(id, position) {
                    Ok(()) => break,
                    Err(e) => {
                        attempt += 1;
                        if attempt >= FRAME_WRITE_RETRIES {
                            warn!("Servo {} rejected goal after {} attempts", id, attempt);
                            return Err(e);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{LegPose, NUM_LEGS};
    use crate::servo::testing::{BusCall, RecordingBus};

    fn pose_with_leg0(coxa: u16, femur: u16, tibia: u16) -> PoseMessage {
        let mut legs = [LegPose::default(); NUM_LEGS];
        legs[0] = LegPose { coxa, femur, tibia };
        PoseMessage {
            network_id: 1,
            legs,
        }
    }

    #[test]
    fn test_initialize_sequences_each_servo() {
        let (bus, log) = RecordingBus::new();
        let mut driver = ServoDriver::new(bus);
        driver.initialize().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 4 * NUM_JOINTS);
        for id in 1..=NUM_JOINTS as u8 {
            let base = 4 * (id as usize - 1);
            assert_eq!(log[base], BusCall::Ping(id));
            assert_eq!(log[base + 1], BusCall::TorqueOff(id));
            assert_eq!(log[base + 2], BusCall::SetMode(id, OperatingMode::Position));
            assert_eq!(log[base + 3], BusCall::TorqueOn(id));
        }
    }

    #[test]
    fn test_initialize_retries_through_transient_failures() {
        let (bus, log) = RecordingBus::new();
        let bus = bus.fail_torque_off(3, 2);
        let mut driver = ServoDriver::new(bus);
        driver.initialize().unwrap();

        let torque_offs = log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == BusCall::TorqueOff(3))
            .count();
        assert_eq!(torque_offs, 3);
    }

    #[test]
    fn test_initialize_reports_exhausted_setup() {
        let (bus, _log) = RecordingBus::new();
        let bus = bus.fail_torque_off(2, u32::MAX);
        let mut driver = ServoDriver::new(bus);

        let err = driver.initialize().unwrap_err();
        assert_eq!(err.id, 2);
        assert_eq!(err.step, "torque off");
    }

    #[test]
    fn test_apply_pose_write_order() {
        let (bus, log) = RecordingBus::new();
        let mut driver = ServoDriver::new(bus);
        driver.apply_pose(&pose_with_leg0(100, 200, 300));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), NUM_JOINTS);
        assert_eq!(log[0], BusCall::Goal(1, 100));
        assert_eq!(log[1], BusCall::Goal(2, 200));
        assert_eq!(log[2], BusCall::Goal(3, 300));
        for id in 4..=NUM_JOINTS as u8 {
            assert_eq!(log[id as usize - 1], BusCall::Goal(id, 0));
        }
    }

    #[test]
    fn test_apply_pose_skips_failed_joint() {
        let (bus, log) = RecordingBus::new();
        let bus = bus.fail_goal(5, u32::MAX);
        let mut driver = ServoDriver::new(bus);
        driver.apply_pose(&pose_with_leg0(100, 200, 300));

        // Exactly one attempt per joint: no retry in live mode, and the
        // failure on servo 5 does not block the remaining joints
        let log = log.lock().unwrap();
        assert_eq!(log.len(), NUM_JOINTS);
        for id in 1..=NUM_JOINTS as u8 {
            assert!(matches!(log[id as usize - 1], BusCall::Goal(i, _) if i == id));
        }
    }

    #[test]
    fn test_apply_frame_retries_within_bound() {
        let (bus, log) = RecordingBus::new();
        let bus = bus.fail_goal(5, 2);
        let mut driver = ServoDriver::new(bus);

        let frame = [7u16; NUM_JOINTS];
        driver.apply_frame(&frame).unwrap();

        let log = log.lock().unwrap();
        // 18 accepted writes plus 2 rejected attempts on servo 5
        assert_eq!(log.len(), NUM_JOINTS + 2);
        let servo5_attempts = log.iter().filter(|c| **c == BusCall::Goal(5, 7)).count();
        assert_eq!(servo5_attempts, 3);
        assert_eq!(*log.last().unwrap(), BusCall::Goal(18, 7));
    }

    #[test]
    fn test_apply_frame_abandons_after_bound() {
        let (bus, log) = RecordingBus::new();
        let bus = bus.fail_goal(5, u32::MAX);
        let mut driver = ServoDriver::new(bus);

        let frame = [7u16; NUM_JOINTS];
        driver.apply_frame(&frame).unwrap_err();

        let log = log.lock().unwrap();
        let servo5_attempts = log.iter().filter(|c| **c == BusCall::Goal(5, 7)).count();
        assert_eq!(servo5_attempts, FRAME_WRITE_RETRIES as usize);
        // Frame abandoned: servos past 5 were never attempted
        assert!(!log.iter().any(|c| matches!(c, BusCall::Goal(id, _) if *id > 5)));
    }
}
