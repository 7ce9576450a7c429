//! Transports and process hosts for the bridge channel.

pub mod in_memory;
pub mod process;
