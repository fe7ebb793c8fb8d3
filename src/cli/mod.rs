//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing and the `config` subcommand
//! handlers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction};
pub use commands::handle_config_action;
