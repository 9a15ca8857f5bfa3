use weld_model::{EvaluationResult, Step, StepKind, StepResult};

use crate::context::PluginContext;
use crate::error::PluginError;

/// The contract every step kind implements: validate its own payload shape,
/// report the live state against the declared intent without changing
/// anything (`evaluate`), then converge it (`apply`).
///
/// `apply` is always preceded by an `evaluate` call on the same step within
/// a single run — plugins may assume `eval` reflects current state and
/// reuse whatever it stashed in `EvaluationResult::internal_data` instead
/// of re-probing the system.
pub trait Plugin: Send + Sync {
    fn kind(&self) -> StepKind;

    /// Structural check of a step's flattened payload, run once per step
    /// during document validation, well before any evaluate/apply call.
    fn validate_payload(&self, step: &Step) -> Result<(), PluginError>;

    fn evaluate(
        &self,
        step: &Step,
        ctx: &PluginContext,
    ) -> Result<EvaluationResult, PluginError>;

    fn apply(
        &self,
        step: &Step,
        ctx: &PluginContext,
        eval: &EvaluationResult,
    ) -> Result<StepResult, PluginError>;
}
