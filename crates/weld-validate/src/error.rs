use thiserror::Error;
use weld_model::StepKind;

use crate::field_path::FieldPath;

/// A single semantic problem found in a document. Validation collects
/// every error it finds rather than bailing on the first one, so a user
/// sees the whole list of things to fix in one pass.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{path}: version `{version}` is not a valid semver string")]
    InvalidVersion { path: FieldPath, version: String },

    #[error("{path}: name must be 1..100 characters, got {len}")]
    InvalidName { path: FieldPath, len: usize },

    #[error("{path}: `parallel` must be in 1..32, got {value}")]
    InvalidParallel { path: FieldPath, value: u32 },

    #[error("{path}: `timeout_seconds` must be 0 (disabled) or in 1..360000, got {value}")]
    InvalidTimeoutSeconds { path: FieldPath, value: u64 },

    #[error("{path}: `verify_timeout_seconds` must be in 1..600, got {value}")]
    InvalidVerifyTimeoutSeconds { path: FieldPath, value: u32 },

    #[error("{path}: step id cannot be empty")]
    EmptyId { path: FieldPath },

    #[error("{path}: step id `{id}` does not match pattern `^[a-z0-9_-]+$`")]
    InvalidId { path: FieldPath, id: String },

    #[error("{path}: duplicate step id `{id}`")]
    DuplicateId { path: FieldPath, id: String },

    #[error("{path}: step `{step}` depends on `{dep}`, which does not exist")]
    UnknownDependency {
        path: FieldPath,
        step: String,
        dep: String,
    },

    #[error("{path}: step `{step}` depends on itself")]
    SelfDependency { path: FieldPath, step: String },

    #[error("dependency cycle: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    #[error("{path}: no plugin registered for step `{step}` of kind `{kind}`")]
    PluginNotFound {
        path: FieldPath,
        step: String,
        kind: StepKind,
    },

    #[error("{path}: step `{step}` has an invalid payload: {message}")]
    InvalidPayload {
        path: FieldPath,
        step: String,
        message: String,
    },
}
