//! The camera skill: opens the assistant's camera page on voice request,
//! either as a live view or to take a single photo.

#[macro_use]
extern crate tracing;

mod config;
mod locale;
mod mode;
mod skill;

pub use config::*;
pub use mode::*;
pub use skill::*;
