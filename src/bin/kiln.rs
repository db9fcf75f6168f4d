//! kiln CLI Binary
//!
//! Command-line interface for the kiln incremental generation framework.

use clap::Parser;
use kiln::cli::{Cli, RunContext};
use kiln::config::{ConfigLoader, KilnConfig};
use kiln::logging::{init_logging, resolve_log_file_path, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("kiln starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing workspace: {}", e);
            eprintln!("{}", kiln::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            if !output.text.is_empty() {
                println!("{}", output.text);
            }
            process::exit(output.exit_code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", kiln::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and the config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path).ok(),
        None => ConfigLoader::load(&cli.workspace).ok(),
    };
    let file_config = loaded.unwrap_or_else(KilnConfig::default);
    let mut config = file_config.logging.clone();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    if config.output == "file" {
        let store_dir = file_config.storage.store_path(&cli.workspace);
        config.file = Some(resolve_log_file_path(config.file.as_deref(), &store_dir));
    }

    config
}
