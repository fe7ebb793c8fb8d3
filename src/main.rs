use std::process::ExitCode;

use clap::Parser;

use termin8::cli::{handle_config_action, Args, Command};
use termin8::config::{self, Config};
use termin8::logging;
use termin8::relay::ExitReason;
use termin8::session::{self, SessionOptions};

fn main() -> ExitCode {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(config::default_path);

    if let Some(Command::Config { action }) = &args.command {
        return match handle_config_action(action.clone(), &config_path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e),
        };
    }

    // If --config is specified, require the file to exist
    let cfg = match &args.config {
        Some(path) => Config::load_explicit(path),
        None => Config::load(Some(config_path.as_path())),
    };
    let cfg = match cfg {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    if let Some(log_file) = args.log_file.as_ref().or(cfg.logging.file.as_ref()) {
        if let Err(e) = logging::init(log_file, cfg.logging.level.as_deref()) {
            eprintln!("Warning: {}", e);
        }
    }

    let options = match SessionOptions::resolve(&args, &cfg) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };

    // The terminal is restored before run returns, so errors print cleanly.
    match session::run(&options) {
        Ok(ExitReason::Signal(signal)) => ExitCode::from(128u8.saturating_add(signal as u8)),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(err: &dyn std::error::Error) -> ExitCode {
    log::error!("{}", err);
    eprintln!("Error: {}", err);
    ExitCode::FAILURE
}
