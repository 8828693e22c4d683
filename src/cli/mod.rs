pub mod args;
pub mod interactive;
