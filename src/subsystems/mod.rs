//! Subsystem modules for the relay bot.

pub mod comms;
pub mod relay;
pub mod runtime;
