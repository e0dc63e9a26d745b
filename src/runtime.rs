// Two-phase startup and the live actuation loop
//
// Phase 1: the bus worker configures every joint, then replays the
// configured motion primitives while it exclusively owns the driver.
// Phase 2: the same thread enters the actuation loop and drains the
// command queue until shutdown. Live commands arriving during Phase 1
// accumulate in the queue (evicting the oldest when full) and are applied
// once Phase 2 begins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::config::{QUEUE_CAPACITY, QUEUE_POP_TIMEOUT, RuntimeConfig, SERIAL_BAUDRATE};
use crate::primitive::{self, PrimitiveLibrary};
use crate::queue::CommandQueue;
use crate::receiver;
use crate::servo::{DynamixelBus, ServoBus, ServoDriver};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn run(config: RuntimeConfig) -> Result<(), BoxError> {
    let queue = Arc::new(CommandQueue::new(QUEUE_CAPACITY));

    let socket = UdpSocket::bind(&config.bind_addr).await?;
    tokio::spawn(receiver::receive_loop(socket, Arc::clone(&queue)));

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    // Serial I/O is blocking, so everything that touches the bus lives on
    // its own thread
    tokio::task::spawn_blocking(move || drive(config, queue, shutdown)).await?
}

/// Bus-side worker: owns the servo driver for the life of the process.
fn drive(
    config: RuntimeConfig,
    queue: Arc<CommandQueue>,
    shutdown: Arc<AtomicBool>,
) -> Result<(), BoxError> {
    info!("Opening servo bus on {}", config.serial_port);
    let bus = DynamixelBus::open(&config.serial_port, SERIAL_BAUDRATE)?;
    let mut driver = ServoDriver::new(bus);
    driver.initialize()?;

    let library = PrimitiveLibrary::new(&config.primitive_dir);
    match library.list() {
        Ok(names) => info!("Motion primitives available: {:?}", names),
        Err(e) => warn!("Cannot list primitive directory: {}", e),
    }

    for name in &config.primitives {
        match library.load(name) {
            Ok(p) => primitive::play(&mut driver, &p),
            Err(e) => warn!("Skipping primitive: {}", e),
        }
    }

    info!("Entering live control loop");
    actuation_loop(&mut driver, &queue, &shutdown);
    Ok(())
}

/// Steady state: drain the command queue and fan each pose out to the
/// bus. The bounded pop keeps the loop responsive to shutdown while idle.
fn actuation_loop<B: ServoBus>(
    driver: &mut ServoDriver<B>,
    queue: &CommandQueue,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        if let Some(msg) = queue.pop_timeout(QUEUE_POP_TIMEOUT) {
            driver.apply_pose(&msg);
        }
    }
    info!("Actuation loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{LegPose, NUM_LEGS, PoseMessage};
    use crate::servo::NUM_JOINTS;
    use crate::servo::testing::{BusCall, RecordingBus};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_actuation_loop_applies_queued_pose_and_stops() {
        let (bus, log) = RecordingBus::new();
        let mut driver = ServoDriver::new(bus);
        let queue = CommandQueue::new(4);
        let shutdown = AtomicBool::new(false);

        thread::scope(|s| {
            let worker = s.spawn(|| actuation_loop(&mut driver, &queue, &shutdown));

            queue.push(PoseMessage {
                network_id: 1,
                legs: [LegPose::default(); NUM_LEGS],
            });
            thread::sleep(Duration::from_millis(100));
            shutdown.store(true, Ordering::Relaxed);
            worker.join().unwrap();
        });

        let log = log.lock().unwrap();
        assert_eq!(log.len(), NUM_JOINTS);
        assert_eq!(log[0], BusCall::Goal(1, 0));
    }

    #[test]
    fn test_actuation_loop_stops_while_idle() {
        let (bus, log) = RecordingBus::new();
        let mut driver = ServoDriver::new(bus);
        let queue = CommandQueue::new(4);
        let shutdown = AtomicBool::new(false);

        thread::scope(|s| {
            let worker = s.spawn(|| actuation_loop(&mut driver, &queue, &shutdown));

            thread::sleep(Duration::from_millis(60));
            shutdown.store(true, Ordering::Relaxed);
            worker.join().unwrap();
        });

        assert!(log.lock().unwrap().is_empty());
    }
}
