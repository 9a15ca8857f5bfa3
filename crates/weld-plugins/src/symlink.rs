use serde::Deserialize;

use weld_model::{CurrentState, EvaluationResult, Step, StepKind, StepResult, StepStatus};
use weld_plugin::{Plugin, PluginContext, PluginError};

use crate::payload::decode;

#[derive(Deserialize)]
struct Payload {
    src: String,
    dest: String,
}

/// Ensures `dest` is a symlink pointing at `src`, replacing whatever is
/// there (file, stale symlink, or nothing) if it isn't already.
pub struct SymlinkPlugin;

impl Plugin for SymlinkPlugin {
    fn kind(&self) -> StepKind {
        StepKind::Symlink
    }

    fn validate_payload(&self, step: &Step) -> Result<(), PluginError> {
        decode::<Payload>(step).map(|_| ())
    }

    fn evaluate(&self, step: &Step, ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
        let p: Payload = decode(step)?;
        let dest = ctx.resolve(&p.dest);
        let src = ctx.resolve(&p.src);

        match std::fs::read_link(&dest) {
            Ok(target) if target == src => {
                Ok(EvaluationResult::satisfied(&step.id, format!("`{}` already linked", p.dest)))
            }
            Ok(_) => Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Drifted,
                requires_action: true,
                message: format!("`{}` links elsewhere", p.dest),
                diff: None,
                internal_data: None,
            }),
            Err(_) if dest.exists() => Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Drifted,
                requires_action: true,
                message: format!("`{}` exists and is not a symlink", p.dest),
                diff: None,
                internal_data: None,
            }),
            Err(_) => Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Missing,
                requires_action: true,
                message: format!("`{}` does not exist", p.dest),
                diff: None,
                internal_data: None,
            }),
        }
    }

    fn apply(
        &self,
        step: &Step,
        ctx: &PluginContext,
        _eval: &EvaluationResult,
    ) -> Result<StepResult, PluginError> {
        let p: Payload = decode(step)?;
        let dest = ctx.resolve(&p.dest);
        let src = ctx.resolve(&p.src);

        let to_err = |e: std::io::Error| PluginError::Execution {
            step_id: step.id.clone(),
            message: e.to_string(),
        };

        if dest.exists() || dest.symlink_metadata().is_ok() {
            std::fs::remove_file(&dest).or_else(|_| std::fs::remove_dir_all(&dest)).map_err(to_err)?;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }

        #[cfg(unix)]
        std::os::unix::fs::symlink(&src, &dest).map_err(to_err)?;
        #[cfg(not(unix))]
        std::os::windows::fs::symlink_file(&src, &dest).map_err(to_err)?;

        Ok(StepResult {
            step_id: step.id.clone(),
            status: StepStatus::Success,
            message: format!("linked `{}` -> `{}`", p.dest, p.src),
            duration: std::time::Duration::ZERO,
            timestamp: chrono::Utc::now(),
            error: None,
        })
    }
}
