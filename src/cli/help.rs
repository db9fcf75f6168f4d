//! CLI command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string used in log events (e.g. "generate", "clean").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::Clean { .. } => "clean",
        Commands::Status { .. } => "status",
        Commands::Vars { .. } => "vars",
    }
}
