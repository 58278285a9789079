//! CLI layer: argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod error;
pub mod output;

pub use args::{parse_settings, ParsedSettings, USAGE, VERSION};
pub use commands::Dispatcher;
pub use error::{CliError, CliResult};
