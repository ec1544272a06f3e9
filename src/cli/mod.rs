//! Command-line interface components
//!
//! This module contains CLI-specific code for the Proxy Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{ArchiveArgs, Cli, Commands, FetchArgs, GlobalArgs, IdArgs, InspectArgs};
pub use commands::{handle_fetch, handle_id, handle_inspect};
pub use progress::scan_spinner;
