use thiserror::Error;
use weld_model::StepKind;

/// Errors surfaced by the plugin contract itself, as distinct from
/// whatever a plugin's own `apply`/`evaluate` body fails with internally
/// (those are folded into `Execution`'s message).
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("no plugin registered for step kind `{0}`")]
    NotFound(StepKind),

    #[error("invalid payload for step `{step_id}` (kind `{kind}`): {message}")]
    InvalidPayload {
        step_id: String,
        kind: StepKind,
        message: String,
    },

    #[error("step `{step_id}` failed: {message}")]
    Execution { step_id: String, message: String },

    /// Raised from `evaluate` only: the plugin could not tell what state
    /// the system is in (a command it needs to probe with errored, a file
    /// it needs to read is unreadable for reasons other than "missing").
    /// Distinct from `Execution`, which means a side effect was attempted
    /// and failed.
    #[error("step `{step_id}` state could not be determined: {message}")]
    State { step_id: String, message: String },
}
