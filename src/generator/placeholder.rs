//! Placeholder generator
//!
//! Replaces `{{ name }}` and `{{ a.b.c }}` references in each input with
//! values from the `context` metadata object. One output per input.
//!
//! In strict mode an undefined reference fails the unit. With the
//! `ignore_errors` metadata flag set, undefined references render as empty
//! text and malformed placeholders are copied through verbatim.

use crate::context::{InvocationContext, Metadata};
use crate::generator::{Generator, RenderError};
use crate::grouping::GroupingPolicy;
use serde_json::Value;
use std::path::Path;

/// Metadata key holding the substitution values (a JSON object).
pub const CONTEXT_KEY: &str = "context";
/// Metadata flag switching to lenient rendering.
pub const IGNORE_ERRORS_KEY: &str = "ignore_errors";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Var(&'a str),
    /// A `{{ ... }}` block that is not a plain reference, kept verbatim
    Literal(&'a str),
}

#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    policy: GroupingPolicy,
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self::new(GroupingPolicy::PerItem)
    }
}

impl PlaceholderGenerator {
    pub fn new(policy: GroupingPolicy) -> Self {
        Self { policy }
    }

    /// Referenced variable names, in order of first appearance.
    pub fn variables(template: &str) -> Result<Vec<String>, String> {
        let mut names: Vec<String> = Vec::new();
        for segment in parse(template)? {
            if let Segment::Var(name) = segment {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Render one template against a context object.
    pub fn render_str(template: &str, values: &Value, lenient: bool) -> Result<String, String> {
        let segments = match parse(template) {
            Ok(segments) => segments,
            Err(_) if lenient => return Ok(template.to_string()),
            Err(e) => return Err(e),
        };

        let mut out = String::with_capacity(template.len());
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Literal(raw) => {
                    if lenient {
                        out.push_str(raw);
                    } else {
                        return Err(format!("unsupported placeholder '{}'", raw));
                    }
                }
                Segment::Var(name) => match lookup(values, name) {
                    Some(value) => out.push_str(&display_value(value)),
                    None if lenient => {}
                    None => return Err(format!("'{}' is undefined", name)),
                },
            }
        }
        Ok(out)
    }

    fn render_input(&self, input: &Path, metadata: &Metadata) -> Result<Vec<u8>, RenderError> {
        let template = std::fs::read_to_string(input)
            .map_err(|e| RenderError::for_input(input, format!("failed to read template: {}", e)))?;
        let values = metadata.get(CONTEXT_KEY).cloned().unwrap_or(Value::Null);
        let lenient = metadata.get_bool(IGNORE_ERRORS_KEY);

        Self::render_str(&template, &values, lenient)
            .map(String::into_bytes)
            .map_err(|message| RenderError::for_input(input, message))
    }
}

impl Generator for PlaceholderGenerator {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn grouping_policy(&self) -> GroupingPolicy {
        self.policy
    }

    fn render(&self, context: &InvocationContext) -> Result<Vec<Vec<u8>>, RenderError> {
        if context.inputs().len() != context.outputs().len() {
            return Err(RenderError::new(format!(
                "expected one output per input, got {} inputs and {} outputs",
                context.inputs().len(),
                context.outputs().len()
            )));
        }
        context
            .inputs()
            .iter()
            .map(|input| self.render_input(input, context.metadata()))
            .collect()
    }
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, String> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or_else(|| "unterminated placeholder".to_string())?;
        let raw = &rest[start..start + 2 + end + 2];
        let name = after_open[..end].trim();
        if is_reference(name) {
            segments.push(Segment::Var(name));
        } else {
            segments.push(Segment::Literal(raw));
        }
        rest = &after_open[end + 2..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}

fn is_reference(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'))
}

fn lookup<'v>(values: &'v Value, name: &str) -> Option<&'v Value> {
    name.split('.').try_fold(values, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
