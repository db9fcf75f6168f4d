//! Generator plugin contract
//!
//! A generator turns the inputs of one unit of work into one byte buffer per
//! declared output. It also declares how inputs are grouped into units and,
//! optionally, which metadata differences matter for staleness. Everything
//! else (staleness, output writes, bookkeeping) is the orchestrator's job.

pub mod placeholder;

pub use placeholder::PlaceholderGenerator;

use crate::context::InvocationContext;
use crate::grouping::GroupingPolicy;
use crate::staleness::MetadataComparator;
use std::fmt;
use std::path::PathBuf;

/// A generator's own failure for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    /// Input that failed, when the generator can tell
    pub input: Option<PathBuf>,
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            input: None,
            message: message.into(),
        }
    }

    pub fn for_input(input: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            Some(input) => write!(f, "{}: {}", input.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RenderError {}

pub trait Generator: Send + Sync {
    /// Name used in logs and summaries.
    fn name(&self) -> &str;

    fn grouping_policy(&self) -> GroupingPolicy;

    /// Metadata equality override. `None` means structural equality.
    fn comparator(&self) -> Option<&dyn MetadataComparator> {
        None
    }

    /// Produce one buffer per output of `context`, in output order.
    fn render(&self, context: &InvocationContext) -> Result<Vec<Vec<u8>>, RenderError>;
}
