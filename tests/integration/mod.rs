//! Integration tests for the kiln invocation framework

pub mod test_utils;

mod binary_logging;
mod orchestrator_properties;
