//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction};
pub use commands::{
    handle_config_action, load_config, rerun_command, run_convert, run_export, run_generate,
    setup_ctrlc_handler, GenerateOptions,
};
pub use enums::BackendArg;
