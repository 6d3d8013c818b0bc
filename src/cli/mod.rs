pub mod commands;
pub mod lateral;
pub mod persist;
pub mod settings;

pub use commands::{Cli, Commands};
