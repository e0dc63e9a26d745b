// Timing, queue sizing, retry bounds, default endpoints
use std::path::PathBuf;
use std::time::Duration;

// Bounded wait on an empty command queue before the actuation loop polls again
pub const QUEUE_POP_TIMEOUT: Duration = Duration::from_millis(20);

// Command queue depth: absorbs scheduling jitter, never sustained backlog
pub const QUEUE_CAPACITY: usize = 16;

// Pause between motion primitive frames
pub const STEP_INTERVAL: Duration = Duration::from_millis(20);

// Per-joint write attempts during primitive playback before the frame is abandoned
pub const FRAME_WRITE_RETRIES: u32 = 32;

// Per-step attempts while configuring a servo at boot
pub const SETUP_RETRY_LIMIT: u32 = 20;
pub const SETUP_RETRY_BACKOFF: Duration = Duration::from_millis(25);

// Servo bus serial configuration
// Baudrate has to match what the servos are flashed with
pub const SERIAL_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

// UDP endpoint for inbound pose commands
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3333";

// Motion primitive storage
pub const DEFAULT_PRIMITIVE_DIR: &str = "primitives";
pub const DEFAULT_PRIMITIVES: [&str; 2] = ["tripod", "rotate"];

/// Everything the runtime needs to start, assembled from the CLI in main.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub serial_port: String,
    pub bind_addr: String,
    pub primitive_dir: PathBuf,
    pub primitives: Vec<String>,
}
