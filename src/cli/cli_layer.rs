// Command line layer - argument parsing and one handler file per feature.

#[path = "commands/command_catalog.rs"]
pub mod commands;

pub mod context;

pub use commands::{run, Cli};
pub use context::AppContext;
