use thiserror::Error;

/// Errors raised while loading a document into the typed model.
///
/// Structural/semantic validity (duplicate IDs, cycles, schema) is a
/// separate concern owned by `weld-validate::ValidationError` — this type
/// only covers the mapping from serialized text into `Document`.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to parse document as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse document as JSON: {0}")]
    Json(#[from] serde_json::Error),
}
