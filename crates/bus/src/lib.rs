//! Client side of the assistant's websocket message bus.
//!
//! [`BusTask`] owns the connection. Everything else in the process talks to it
//! through channels: outbound messages go in via an [`Emitter`], inbound
//! messages come out as [`BusEvent`]s.

#[macro_use]
extern crate tracing;

mod config;
mod emitter;
mod message;
mod task;

pub use config::*;
pub use emitter::*;
pub use message::*;
pub use task::*;
