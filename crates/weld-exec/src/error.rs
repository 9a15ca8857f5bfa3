use thiserror::Error;

/// Errors an executor run can fail with outright, as opposed to a single
/// step failing (which is recorded in its `StepResult` instead of
/// propagated here).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("step `{0}` panicked during execution")]
    Panicked(String),

    #[error(transparent)]
    Plugin(#[from] weld_plugin::PluginError),

    #[error(transparent)]
    Dag(#[from] weld_dag::DagError),

    #[error("verification cancelled")]
    Cancelled,
}
