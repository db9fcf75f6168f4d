//! CLI parse: clap types for kiln. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// kiln - incremental code generation from templates
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(about = "Incremental code generation with content-hash staleness detection")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces global and workspace config files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// How per-item units are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobsMode {
    Serial,
    Parallel,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render templates into the output root, skipping up-to-date outputs
    Generate {
        /// Template files or directories (directories are searched for the template marker)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output root (overrides generation.output_root)
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,

        /// Context value as key=value; repeat a key to build an array
        #[arg(long = "context", short = 'c', value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// JSON or TOML file with context values
        #[arg(long)]
        context_file: Option<PathBuf>,

        /// Keep each input's directory relative to the inputs' common root
        #[arg(long)]
        preserve_structure: bool,

        /// Render undefined variables as empty and treat render failures as skips
        #[arg(long)]
        ignore_errors: bool,

        /// Regenerate every output regardless of staleness
        #[arg(long)]
        force: bool,

        /// Treat all inputs as one unit: all outputs succeed or none are written
        #[arg(long)]
        atomic: bool,

        /// Schedule per-item units serially or in parallel
        #[arg(long, value_enum)]
        jobs: Option<JobsMode>,

        /// Worker threads for parallel runs (0 = one per core)
        #[arg(long)]
        threads: Option<usize>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete generated outputs and their recorded contexts
    Clean {
        /// Files or directories to clean (default: the output root)
        locations: Vec<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List recorded output groups
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List the variables each template references
    Vars {
        /// Template files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
