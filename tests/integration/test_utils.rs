//! Shared test utilities for integration tests
//!
//! Provides a scripted generator, a workspace fixture, and serialized access
//! to the environment variables the config loader reads.

use kiln::context::{InvocationContext, RawMetadata};
use kiln::generator::{Generator, RenderError};
use kiln::grouping::{GroupingPolicy, OutputNaming};
use kiln::orchestrator::{InvocationOptions, InvocationRequest, Orchestrator, RunReport};
use kiln::staleness::{IgnoreKeysComparator, InvocationReason, MetadataComparator};
use kiln::store::{ContextStore, MemoryContextStore};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    kiln_env: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            kiln_env: std::env::var("KILN_ENV").ok(),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("XDG_CONFIG_HOME", self.xdg_config_home);
        restore_var("KILN_ENV", self.kiln_env);
    }
}

fn restore_var(name: &str, value: Option<String>) {
    match value {
        Some(v) => std::env::set_var(name, v),
        None => std::env::remove_var(name),
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`.
///
/// The global config file then lives at `<test_dir>/xdg/kiln/config.toml`.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    let test_config_home = test_dir.path().join("xdg");
    std::fs::create_dir_all(&test_home).unwrap();
    std::fs::create_dir_all(&test_config_home).unwrap();

    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);
    std::env::remove_var("KILN_ENV");

    let result = f();
    env_state.restore();
    result
}

/// Set KILN_ENV for the duration of `f`. Must be called inside `with_xdg_env`.
pub fn with_kiln_env<F, R>(name: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    std::env::set_var("KILN_ENV", name);
    let result = f();
    std::env::remove_var("KILN_ENV");
    result
}

/// Generator whose failures and comparator are controlled by the test.
///
/// Output for each input is `<input bytes>|<metadata json>`, so any change to
/// content or metadata shows up in the rendered bytes.
pub struct ScriptedGenerator {
    policy: GroupingPolicy,
    failing: Mutex<HashSet<String>>,
    comparator: Option<IgnoreKeysComparator>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(policy: GroupingPolicy) -> Self {
        Self {
            policy,
            failing: Mutex::new(HashSet::new()),
            comparator: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ignoring_keys(mut self, keys: &[&str]) -> Self {
        self.comparator = Some(IgnoreKeysComparator::new(keys.iter().copied()));
        self
    }

    /// Fail any unit containing an input with this file name.
    pub fn fail_on(&self, file_name: &str) {
        self.failing.lock().insert(file_name.to_string());
    }

    pub fn stop_failing(&self, file_name: &str) {
        self.failing.lock().remove(file_name);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn grouping_policy(&self) -> GroupingPolicy {
        self.policy
    }

    fn comparator(&self) -> Option<&dyn MetadataComparator> {
        self.comparator.as_ref().map(|c| c as &dyn MetadataComparator)
    }

    fn render(&self, context: &InvocationContext) -> Result<Vec<Vec<u8>>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing.lock().clone();
        let metadata = context
            .metadata()
            .to_json()
            .map_err(|e| RenderError::new(e.to_string()))?;

        context
            .inputs()
            .iter()
            .map(|input| {
                let name = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if failing.contains(&name) {
                    return Err(RenderError::for_input(input, "scripted failure"));
                }
                let body = std::fs::read(input)
                    .map_err(|e| RenderError::for_input(input, e.to_string()))?;
                let mut out = body;
                out.push(b'|');
                out.extend_from_slice(metadata.as_bytes());
                Ok(out)
            })
            .collect()
    }
}

/// Temporary workspace with `templates/` inputs and an `out/` output root.
pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<MemoryContextStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            store: Arc::new(MemoryContextStore::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_input(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root().join("templates").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    pub fn out_root(&self) -> PathBuf {
        self.root().join("out")
    }

    /// Output path for an input name with the `tmpl` marker removed.
    pub fn output(&self, name: &str) -> PathBuf {
        self.out_root().join(name.replace(".tmpl", ""))
    }

    pub fn naming(&self) -> OutputNaming {
        OutputNaming {
            output_root: self.out_root(),
            preserve_structure: false,
            template_marker: Some("tmpl".to_string()),
        }
    }

    pub fn run(
        &self,
        generator: &Arc<ScriptedGenerator>,
        inputs: &[PathBuf],
        metadata: RawMetadata,
        options: InvocationOptions,
    ) -> RunReport {
        let store: Arc<dyn ContextStore> = self.store.clone();
        let generator: Arc<dyn Generator> = generator.clone();
        Orchestrator::new(generator, store)
            .with_options(options)
            .run(&InvocationRequest {
                inputs: inputs.to_vec(),
                naming: self.naming(),
                metadata,
            })
            .unwrap()
    }
}

/// Serial options: deterministic scheduling for assertions on call counts.
pub fn serial() -> InvocationOptions {
    InvocationOptions {
        parallel: false,
        ..InvocationOptions::default()
    }
}

pub fn reasons(report: &RunReport) -> Vec<Option<InvocationReason>> {
    report.outcomes.iter().map(|o| o.reason).collect()
}
