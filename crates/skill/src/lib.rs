//! Runtime for skills that live outside the assistant's own process.
//!
//! A skill implements [`Skill`], registers its handlers in a
//! [`HandlerRegistry`] and is driven by a [`SkillTask`], which receives
//! [`BusEvent`](cs_bus::BusEvent)s from the bus task and runs the matching
//! handlers one at a time. Handlers reach the GUI through the
//! [`GuiSession`] inside their [`SkillContext`].

#[macro_use]
extern crate tracing;

mod command;
mod config;
mod context;
mod dialog;
mod gui;
mod skill;
mod task;

pub use command::*;
pub use config::*;
pub use context::*;
pub use dialog::*;
pub use gui::*;
pub use skill::{ApiMethod, Handler, HandlerRegistry, IntentRegistration, RuntimeRequirements, Skill};
pub use task::*;
