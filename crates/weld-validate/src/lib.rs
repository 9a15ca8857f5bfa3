//! Structural, dependency, and plugin-contract validation for a document.
//!
//! Validation is handed a `weld_plugin::Registry` explicitly rather than
//! reaching for a global one, so the same document can be validated
//! against different plugin sets (e.g. a test double registry in unit
//! tests versus the real one in the CLI).

pub mod cycle;
pub mod error;
pub mod field_path;
pub mod postrun;
pub mod rules;
pub mod validate;

pub use error::ValidationError;
pub use field_path::FieldPath;
pub use postrun::{all_passed, run as run_postrun, PostRunResult};
pub use validate::validate;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weld_model::{Document, Settings, Step, StepKind};
    use weld_plugin::{PluginContext, PluginError};
    use weld_plugin::{Plugin, Registry};
    use weld_model::{EvaluationResult, StepResult};

    struct AnyPlugin(StepKind);

    impl Plugin for AnyPlugin {
        fn kind(&self) -> StepKind {
            self.0
        }
        fn validate_payload(&self, _step: &Step) -> Result<(), PluginError> {
            Ok(())
        }
        fn evaluate(&self, step: &Step, _ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
            Ok(EvaluationResult::satisfied(&step.id, "ok"))
        }
        fn apply(
            &self,
            step: &Step,
            _ctx: &PluginContext,
            _eval: &EvaluationResult,
        ) -> Result<StepResult, PluginError> {
            Ok(StepResult::skipped(&step.id, "ok"))
        }
    }

    fn doc(steps: Vec<Step>) -> Document {
        Document {
            version: "1.0.0".into(),
            name: "t".into(),
            description: None,
            settings: Settings::default(),
            steps,
            validations: None,
        }
    }

    fn step(id: &str, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            kind: StepKind::Command,
            name: None,
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            enabled: true,
            verify_timeout_seconds: None,
            payload: json!({}),
        }
    }

    #[test]
    fn valid_document_passes() {
        let registry = Registry::new();
        registry.register(std::sync::Arc::new(AnyPlugin(StepKind::Command)));
        let d = doc(vec![step("a", &[]), step("b", &["a"])]);
        assert!(validate(&d, &registry).is_ok());
    }

    #[test]
    fn duplicate_id_reported() {
        let registry = Registry::new();
        let d = doc(vec![step("a", &[]), step("a", &[])]);
        let errs = validate(&d, &registry).unwrap_err();
        assert!(matches!(errs[0], ValidationError::DuplicateId { .. }));
    }

    #[test]
    fn unknown_dependency_reported() {
        let registry = Registry::new();
        let d = doc(vec![step("a", &["missing"])]);
        let errs = validate(&d, &registry).unwrap_err();
        assert!(matches!(errs[0], ValidationError::UnknownDependency { .. }));
    }

    #[test]
    fn cycle_reported_once_ids_are_clean() {
        let registry = Registry::new();
        let d = doc(vec![step("a", &["b"]), step("b", &["a"])]);
        let errs = validate(&d, &registry).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], ValidationError::Cycle { .. }));
    }

    #[test]
    fn missing_plugin_reported() {
        let registry = Registry::new();
        let d = doc(vec![step("a", &[])]);
        let errs = validate(&d, &registry).unwrap_err();
        assert!(matches!(errs[0], ValidationError::PluginNotFound { .. }));
    }

    #[test]
    fn disabled_steps_skip_plugin_check() {
        let registry = Registry::new();
        let mut s = step("a", &[]);
        s.enabled = false;
        let d = doc(vec![s]);
        assert!(validate(&d, &registry).is_ok());
    }
}
