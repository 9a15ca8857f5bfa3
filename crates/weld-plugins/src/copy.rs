use serde::Deserialize;
use sha2::{Digest, Sha256};

use weld_model::{CurrentState, EvaluationResult, Step, StepKind, StepResult, StepStatus};
use weld_plugin::{Plugin, PluginContext, PluginError};

use crate::payload::decode;

#[derive(Deserialize)]
struct Payload {
    src: String,
    dest: String,
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Copies `src` to `dest`, treating the step as satisfied once both files'
/// contents hash identically.
pub struct CopyPlugin;

impl Plugin for CopyPlugin {
    fn kind(&self) -> StepKind {
        StepKind::Copy
    }

    fn validate_payload(&self, step: &Step) -> Result<(), PluginError> {
        decode::<Payload>(step).map(|_| ())
    }

    fn evaluate(&self, step: &Step, ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
        let p: Payload = decode(step)?;
        let src = ctx.resolve(&p.src);
        let dest = ctx.resolve(&p.dest);

        let src_bytes = std::fs::read(&src).map_err(|e| PluginError::Execution {
            step_id: step.id.clone(),
            message: format!("cannot read source `{}`: {e}", p.src),
        })?;

        match std::fs::read(&dest) {
            Ok(dest_bytes) if checksum(&dest_bytes) == checksum(&src_bytes) => {
                Ok(EvaluationResult::satisfied(&step.id, format!("`{}` already matches source", p.dest)))
            }
            Ok(_) => Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Drifted,
                requires_action: true,
                message: format!("`{}` differs from source", p.dest),
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
        let src = ctx.resolve(&p.src);
        let dest = ctx.resolve(&p.dest);

        let to_err = |e: std::io::Error| PluginError::Execution {
            step_id: step.id.clone(),
            message: e.to_string(),
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }
        std::fs::copy(&src, &dest).map_err(to_err)?;

        Ok(StepResult {
            step_id: step.id.clone(),
            status: StepStatus::Success,
            message: format!("copied `{}` -> `{}`", p.src, p.dest),
            duration: std::time::Duration::ZERO,
            timestamp: chrono::Utc::now(),
            error: None,
        })
    }
}
