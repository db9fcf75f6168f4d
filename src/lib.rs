//! kiln: Incremental Code-Generation Invocation Framework
//!
//! Decides whether a generation step needs to run by comparing content
//! fingerprints and generator metadata against the context recorded by the
//! previous successful run, then runs it safely: outputs are written
//! atomically, per-item failures stay isolated, and the recorded context is
//! only replaced after every output of a unit is committed.

pub mod cleaner;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod grouping;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod paths;
pub mod staleness;
pub mod store;
pub mod types;

pub use cleaner::{CleanReport, Cleaner};
pub use context::{InvocationContext, Metadata, RawMetadata};
pub use error::{ApiError, GenerationError, StorageError};
pub use fingerprint::{fingerprint, fingerprint_file, Fingerprint};
pub use generator::{Generator, PlaceholderGenerator, RenderError};
pub use grouping::{GroupingPolicy, OutputNaming};
pub use orchestrator::{
    CancellationToken, InvocationOptions, InvocationRequest, Orchestrator, RunReport, UnitState,
};
pub use staleness::{compare, IgnoreKeysComparator, InvocationReason, MetadataComparator};
pub use store::{ContextStore, MemoryContextStore, SledContextStore};
pub use types::GroupKey;
