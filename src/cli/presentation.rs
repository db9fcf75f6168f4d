//! CLI presentation: text and json formatters per command family.

mod run;
mod store;

pub use run::{format_run_json, format_run_text, format_vars_json, format_vars_text, TemplateVars};
pub use store::{format_clean_json, format_clean_text, format_status_json, format_status_text, StatusRow};
