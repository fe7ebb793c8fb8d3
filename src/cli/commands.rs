//! Subcommand handlers for config actions.

use std::path::Path;

use super::args::ConfigAction;
use crate::config::{Config, ConfigError, DEFAULT_CONFIG};
use crate::pty::select_shell;

/// Handle config subcommand actions against the config file at `config_path`.
pub fn handle_config_action(action: ConfigAction, config_path: &Path) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(config_path))?;
            println!("Current configuration:");
            println!(
                "  Shell: {}",
                select_shell(None, config.shell.command.as_deref())
            );
            println!("  Start in $HOME: {}", yes_no(config.shell.home_dir));
            println!("  Buffer capacity: {} bytes", config.relay.buffer_capacity);
            match &config.transcript.path {
                Some(path) => println!("  Transcript: {}", path.display()),
                None => println!("  Transcript: off"),
            }
            println!("  Escape cap: {} bytes", config.transcript.max_escape_bytes);
            match &config.logging.file {
                Some(path) => println!(
                    "  Log file: {} ({})",
                    path.display(),
                    config.logging.level.as_deref().unwrap_or("info")
                ),
                None => println!("  Log file: off"),
            }
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            write_default_config(config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

/// Write the commented default config, refusing to overwrite an existing one.
pub fn write_default_config(config_path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: config_path.to_path_buf(),
        source,
    };

    if config_path.exists() {
        return Err(ConfigError::Invalid(format!(
            "config file already exists: {} (use 'termin8 config show' to view it)",
            config_path.display()
        )));
    }

    // Create parent directories if needed
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(config_path, DEFAULT_CONFIG).map_err(io_error)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
