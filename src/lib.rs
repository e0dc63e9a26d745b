// UDP-commanded hexapod servo runtime
//
// Receives 39-byte pose datagrams, queues them, and fans each pose out to
// 18 goal-position writes on a Dynamixel bus. At startup, prerecorded
// motion primitives are replayed onto the same bus before live control
// begins.

pub mod config;
pub mod messages;
pub mod primitive;
pub mod queue;
pub mod receiver;
pub mod runtime;
pub mod servo;
