//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

pub mod context_data;
mod help;
pub mod inputs;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, JobsMode};
pub use route::{CommandOutput, RunContext};
