// UDP receiver task
//
// Decodes inbound datagrams into pose messages and hands them to the
// command queue. A malformed datagram is dropped with a warning; a socket
// error never takes the task down.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::messages::PoseMessage;
use crate::queue::CommandQueue;

// Slightly larger than MESSAGE_LENGTH so oversized datagrams are seen (and
// rejected) instead of silently truncated to a valid length.
const RECV_BUFFER_SIZE: usize = 64;

pub async fn receive_loop(socket: UdpSocket, queue: Arc<CommandQueue>) {
    if let Ok(addr) = socket.local_addr() {
        info!("Listening for pose commands on {}", addr);
    }

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, peer)) => match PoseMessage::decode(&buf[..len]) {
                Ok(msg) => {
                    if queue.push(msg).is_some() {
                        debug!("Queue full, evicted oldest pose");
                    }
                }
                Err(e) => warn!("Dropping datagram from {}: {}", peer, e),
            },
            Err(e) => warn!("Receive failed: {}", e),
        }
    }
}
