//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cleaner::Cleaner;
use crate::cli::context_data::build_context;
use crate::cli::help::command_name;
use crate::cli::inputs::expand_inputs;
use crate::cli::parse::{Commands, JobsMode};
use crate::cli::presentation::{
    format_clean_json, format_clean_text, format_run_json, format_run_text, format_status_json,
    format_status_text, format_vars_json, format_vars_text, StatusRow, TemplateVars,
};
use crate::config::{ConfigLoader, KilnConfig};
use crate::context::RawMetadata;
use crate::error::{ApiError, StorageError};
use crate::generator::placeholder::{CONTEXT_KEY, IGNORE_ERRORS_KEY};
use crate::generator::PlaceholderGenerator;
use crate::grouping::GroupingPolicy;
use crate::orchestrator::{InvocationOptions, InvocationRequest, Orchestrator};
use crate::output::all_outputs_exist;
use crate::paths;
use crate::store::{ContextStore, SledContextStore};
use serde_json::Value;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Metadata key recording whether output structure was preserved.
const PRESERVE_STRUCTURE_KEY: &str = "preserve_structure";

/// Text to print and the process exit code for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// Runtime context for CLI execution: workspace, resolved config, and the context store.
pub struct RunContext {
    workspace_root: PathBuf,
    config: KilnConfig,
    store: Arc<SledContextStore>,
    color: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let workspace_root = paths::canonicalize_path(&workspace_root).map_err(|e| {
            ApiError::InvalidInput(format!("Workspace {:?} is not accessible: {}", workspace_root, e))
        })?;
        let config = ConfigLoader::resolve(&workspace_root, config_path.as_deref())?;
        Self::with_config(workspace_root, config)
    }

    /// Create run context from an already-loaded configuration.
    pub fn with_config(workspace_root: PathBuf, config: KilnConfig) -> Result<Self, ApiError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let contexts_path = config.storage.contexts_path(&workspace_root);
        std::fs::create_dir_all(&contexts_path).map_err(StorageError::IoError)?;
        let store = Arc::new(SledContextStore::new(&contexts_path)?);
        debug!(store = %contexts_path.display(), "Opened context store");

        let color = config.logging.color && std::io::stdout().is_terminal();
        Ok(Self {
            workspace_root,
            config,
            store,
            color,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &KilnConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Generate {
                inputs,
                output_dir,
                context,
                context_file,
                preserve_structure,
                ignore_errors,
                force,
                atomic,
                jobs,
                threads,
                format,
            } => {
                let request = GenerateArgs {
                    inputs,
                    output_dir: output_dir.as_deref(),
                    context,
                    context_file: context_file.as_deref(),
                    preserve_structure: *preserve_structure,
                    ignore_errors: *ignore_errors,
                    force: *force,
                    atomic: *atomic,
                    jobs: *jobs,
                    threads: *threads,
                };
                self.handle_generate(&request, format)
            }
            Commands::Clean { locations, format } => self.handle_clean(locations, format),
            Commands::Status { format } => self.handle_status(format),
            Commands::Vars { inputs, format } => self.handle_vars(inputs, format),
        }
    }

    fn handle_generate(&self, args: &GenerateArgs<'_>, format: &str) -> Result<CommandOutput, ApiError> {
        let generation = &self.config.generation;
        let mut naming = generation.naming(&self.workspace_root);
        if let Some(dir) = args.output_dir {
            naming.output_root = self.workspace_root.join(dir);
        }
        naming.preserve_structure |= args.preserve_structure;
        let ignore_errors = args.ignore_errors || generation.ignore_errors;

        let inputs = expand_inputs(args.inputs, naming.template_marker.as_deref())?;
        let values = build_context(args.context, args.context_file)?;
        let metadata = RawMetadata::new()
            .with(CONTEXT_KEY, values)
            .with(PRESERVE_STRUCTURE_KEY, Value::Bool(naming.preserve_structure))
            .with(IGNORE_ERRORS_KEY, Value::Bool(ignore_errors));

        let policy = if args.atomic {
            GroupingPolicy::Atomic
        } else {
            generation.policy
        };
        let options = InvocationOptions {
            force: args.force,
            ignore_errors,
            parallel: match args.jobs {
                Some(JobsMode::Serial) => false,
                Some(JobsMode::Parallel) => true,
                None => generation.parallel,
            },
            max_threads: args.threads.unwrap_or(generation.max_threads),
        };

        let store: Arc<dyn ContextStore> = self.store.clone();
        let orchestrator =
            Orchestrator::new(Arc::new(PlaceholderGenerator::new(policy)), store).with_options(options);
        let report = orchestrator.run(&InvocationRequest {
            inputs,
            naming,
            metadata,
        })?;

        let text = if format == "json" {
            format_run_json(&report)?
        } else {
            format_run_text(&report, self.color)
        };
        Ok(CommandOutput {
            text,
            exit_code: report.exit_code(),
        })
    }

    fn handle_clean(&self, locations: &[PathBuf], format: &str) -> Result<CommandOutput, ApiError> {
        let locations = if locations.is_empty() {
            vec![self.config.generation.naming(&self.workspace_root).output_root]
        } else {
            locations.iter().map(|l| self.workspace_root.join(l)).collect()
        };
        let store: Arc<dyn ContextStore> = self.store.clone();
        let report = Cleaner::new(store).clean(&locations)?;
        self.store.flush()?;

        let text = if format == "json" {
            format_clean_json(&report)?
        } else {
            format_clean_text(&report)
        };
        Ok(CommandOutput::ok(text))
    }

    fn handle_status(&self, format: &str) -> Result<CommandOutput, ApiError> {
        let rows: Vec<StatusRow> = self
            .store
            .list()?
            .into_iter()
            .map(|listing| match listing.entry {
                Some(entry) => {
                    let outputs = entry.output_paths();
                    StatusRow {
                        group_key: listing.group_key.to_string(),
                        inputs: entry.inputs.len(),
                        outputs_present: all_outputs_exist(&outputs),
                        outputs: outputs.iter().map(|p| p.display().to_string()).collect(),
                        recorded_at: Some(entry.recorded_at),
                        corrupt: false,
                    }
                }
                None => StatusRow {
                    group_key: listing.group_key.to_string(),
                    inputs: 0,
                    outputs: Vec::new(),
                    outputs_present: false,
                    recorded_at: None,
                    corrupt: true,
                },
            })
            .collect();

        let text = if format == "json" {
            format_status_json(&rows)?
        } else {
            format_status_text(&rows)
        };
        Ok(CommandOutput::ok(text))
    }

    fn handle_vars(&self, inputs: &[PathBuf], format: &str) -> Result<CommandOutput, ApiError> {
        let naming = self.config.generation.naming(&self.workspace_root);
        let entries: Vec<TemplateVars> = expand_inputs(inputs, naming.template_marker.as_deref())?
            .into_iter()
            .map(|path| {
                let parsed = std::fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|template| PlaceholderGenerator::variables(&template));
                match parsed {
                    Ok(variables) => TemplateVars {
                        path,
                        variables,
                        error: None,
                    },
                    Err(error) => TemplateVars {
                        path,
                        variables: Vec::new(),
                        error: Some(error),
                    },
                }
            })
            .collect();

        let exit_code = if entries.iter().any(|e| e.error.is_some()) {
            1
        } else {
            0
        };
        let text = if format == "json" {
            format_vars_json(&entries)?
        } else {
            format_vars_text(&entries)
        };
        Ok(CommandOutput { text, exit_code })
    }
}

/// Borrowed `generate` arguments.
struct GenerateArgs<'a> {
    inputs: &'a [PathBuf],
    output_dir: Option<&'a Path>,
    context: &'a [String],
    context_file: Option<&'a Path>,
    preserve_structure: bool,
    ignore_errors: bool,
    force: bool,
    atomic: bool,
    jobs: Option<JobsMode>,
    threads: Option<usize>,
}
