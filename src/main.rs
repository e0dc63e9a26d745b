use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hexapod_runtime::config::{
    DEFAULT_BIND_ADDR, DEFAULT_PRIMITIVE_DIR, DEFAULT_PRIMITIVES, DEFAULT_SERIAL_PORT,
    RuntimeConfig,
};

/// UDP-commanded hexapod servo runtime
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Serial port of the servo bus
    #[arg(long, default_value = DEFAULT_SERIAL_PORT)]
    serial_port: String,

    /// UDP address to listen on for pose commands
    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Directory holding motion primitive files
    #[arg(long, default_value = DEFAULT_PRIMITIVE_DIR)]
    primitive_dir: PathBuf,

    /// Motion primitives to play at startup, in order
    #[arg(long = "play", default_values = DEFAULT_PRIMITIVES)]
    play: Vec<String>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let config = RuntimeConfig {
        serial_port: args.serial_port,
        bind_addr: args.bind,
        primitive_dir: args.primitive_dir,
        primitives: args.play,
    };

    if let Err(e) = hexapod_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
