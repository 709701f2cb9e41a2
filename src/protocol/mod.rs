//! Protocol module - Defines the two wire formats spoken with the robot
//!
//! The robot exposes two independent TCP services:
//! - Command channel: newline-terminated ASCII command lines
//! - Video channel: repeating `[4 byte length][payload]` frame units
//!   with a signed little-endian length field

mod command;
mod frame;

pub use command::*;
pub use frame::*;

/// Default port for the command channel
pub const DEFAULT_COMMAND_PORT: u16 = 5050;
