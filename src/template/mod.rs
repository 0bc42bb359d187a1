// ABOUTME: Template module for the workflow orchestrator
// ABOUTME: Resolves ${env.KEY} placeholders against the shared workflow environment

pub mod engine;

pub use engine::{interpolate, interpolate_json, interpolate_map, referenced_keys};
