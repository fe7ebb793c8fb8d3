//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Relay a shell through a PTY, optionally recording a transcript
#[derive(Parser, Debug)]
#[command(name = "termin8")]
#[command(version, about = "Transparent PTY relay with an optional session transcript", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Write a transcript of the session to this file (truncated on start)
    pub transcript: Option<PathBuf>,

    /// Shell to spawn (default: $SHELL or /bin/sh)
    #[arg(short, long)]
    pub shell: Option<String>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Write diagnostics to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Per-direction relay buffer size in bytes
    #[arg(long)]
    pub buffer_capacity: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
