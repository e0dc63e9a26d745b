// Diagnostic pose sender
//
// Encodes one full-body pose and sends it to a running hexapod runtime as
// a single UDP datagram.
//
// Usage: cargo run --bin pose_sender -- 192.168.4.1:3333 512 512 512 ...
// (18 positions, coxa femur tibia per leg, leg 0 first; omit them to
// center every joint)

use clap::Parser;
use tokio::net::UdpSocket;
use tracing::info;

use hexapod_runtime::messages::{LegPose, NUM_LEGS, PoseMessage};
use hexapod_runtime::servo::NUM_JOINTS;

// Mid-range of the 0..4095 position scale
const CENTER_POSITION: u16 = 2048;

/// Send a single pose command to a hexapod runtime
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Runtime address, e.g. 192.168.4.1:3333
    target: String,

    /// Device id carried in the message header
    #[arg(long, default_value_t = 1)]
    network_id: u8,

    /// Goal positions, coxa femur tibia per leg, leg 0 first
    positions: Vec<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let positions = if args.positions.is_empty() {
        vec![CENTER_POSITION; NUM_JOINTS]
    } else if args.positions.len() == NUM_JOINTS {
        args.positions
    } else {
        eprintln!(
            "Expected {} positions (3 per leg), got {}",
            NUM_JOINTS,
            args.positions.len()
        );
        std::process::exit(2);
    };

    let mut legs = [LegPose::default(); NUM_LEGS];
    for (leg, chunk) in positions.chunks_exact(3).enumerate() {
        legs[leg] = LegPose {
            coxa: chunk[0],
            femur: chunk[1],
            tibia: chunk[2],
        };
    }
    let msg = PoseMessage {
        network_id: args.network_id,
        legs,
    };

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.send_to(&msg.encode(), &args.target).await?;
    info!("Sent pose to {}", args.target);

    Ok(())
}
