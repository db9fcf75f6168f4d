//! Input/Output Grouping Policy
//!
//! Turns declared inputs into units of work. Output identifiers are a pure
//! function of the declared inputs and naming options, so store keys stay
//! stable between runs when nothing changed.

use crate::error::ApiError;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// How declared inputs map onto units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingPolicy {
    /// All inputs and outputs form one unit: one context, one generator call.
    Atomic,
    /// One unit per input/output pair, evaluated and invoked independently.
    #[default]
    PerItem,
}

/// Options controlling output identifier derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pub output_root: PathBuf,
    /// Keep each input's directory relative to the inputs' common root.
    pub preserve_structure: bool,
    /// File-name segment removed from outputs (`page.tmpl.html` → `page.html`).
    pub template_marker: Option<String>,
}

impl OutputNaming {
    pub fn flat(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            preserve_structure: false,
            template_marker: None,
        }
    }
}

/// One planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPlan {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

/// Output file name for an input: the input's name minus marker segments.
///
/// Works on the raw name bytes, so names that are not UTF-8 survive intact.
pub fn output_file_name(input: &Path, marker: Option<&str>) -> Option<OsString> {
    let name = input.file_name()?;
    let marker = match marker {
        Some(m) if !m.is_empty() => m.as_bytes(),
        _ => return Some(name.to_os_string()),
    };
    let bytes = paths::os_to_bytes(name);
    let kept: Vec<&[u8]> = bytes.split(|b| *b == b'.').filter(|part| *part != marker).collect();
    let joined = kept.join(&b'.');
    if joined.is_empty() {
        None
    } else {
        Some(paths::os_from_bytes(joined))
    }
}

/// Derive the output path for one input.
///
/// `common_root` is only consulted when structure is preserved.
pub fn derive_output(
    input: &Path,
    common_root: &Path,
    naming: &OutputNaming,
) -> Result<PathBuf, ApiError> {
    let name = output_file_name(input, naming.template_marker.as_deref()).ok_or_else(|| {
        ApiError::PlanningFailed(format!(
            "input {:?} has no file name left once the template marker is removed",
            input
        ))
    })?;

    let mut output = naming.output_root.clone();
    if naming.preserve_structure {
        let parent = input.parent().unwrap_or_else(|| Path::new(""));
        let relative = parent.strip_prefix(common_root).map_err(|_| {
            ApiError::PlanningFailed(format!(
                "input {:?} is not under the common root {:?}",
                input, common_root
            ))
        })?;
        output.push(relative);
    }
    output.push(name);
    Ok(paths::lexical_clean(&output))
}

/// Plan the units of work for a set of declared inputs.
///
/// Inputs are resolved to stable identifiers first; duplicates are dropped
/// (first occurrence wins). Two inputs mapping to the same output, or an
/// output that would overwrite an input, fail planning.
pub fn plan_units(
    inputs: &[PathBuf],
    policy: GroupingPolicy,
    naming: &OutputNaming,
) -> Result<Vec<UnitPlan>, ApiError> {
    if inputs.is_empty() {
        return Err(ApiError::InvalidInput("no inputs declared".to_string()));
    }

    let mut seen = HashSet::new();
    let resolved: Vec<PathBuf> = inputs
        .iter()
        .map(|p| paths::resolve_identifier(p))
        .filter(|p| seen.insert(p.clone()))
        .collect();

    let root = if naming.preserve_structure {
        paths::common_root(&resolved)
    } else {
        PathBuf::new()
    };

    let naming = OutputNaming {
        output_root: paths::resolve_identifier(&naming.output_root),
        ..naming.clone()
    };

    let mut outputs = Vec::with_capacity(resolved.len());
    let mut claimed = HashSet::new();
    let input_set: HashSet<&PathBuf> = resolved.iter().collect();
    for input in &resolved {
        let output = derive_output(input, &root, &naming)?;
        if input_set.contains(&output) {
            return Err(ApiError::PlanningFailed(format!(
                "output {:?} would overwrite an input",
                output
            )));
        }
        if !claimed.insert(output.clone()) {
            return Err(ApiError::PlanningFailed(format!(
                "multiple inputs map to output {:?}",
                output
            )));
        }
        outputs.push(output);
    }

    let units = match policy {
        GroupingPolicy::Atomic => vec![UnitPlan {
            inputs: resolved,
            outputs,
        }],
        GroupingPolicy::PerItem => resolved
            .into_iter()
            .zip(outputs)
            .map(|(input, output)| UnitPlan {
                inputs: vec![input],
                outputs: vec![output],
            })
            .collect(),
    };
    Ok(units)
}
