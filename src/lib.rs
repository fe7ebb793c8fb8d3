//! termin8 library crate.
//!
//! This module exposes the relay components for the binary and for
//! integration testing.

pub mod cli;
pub mod config;
pub mod logging;
pub mod pty;
pub mod relay;
pub mod session;
pub mod terminal;
pub mod transcript;
