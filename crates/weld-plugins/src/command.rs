use std::process::Command as ProcessCommand;

use serde::Deserialize;

use weld_model::{CurrentState, EvaluationResult, Step, StepKind, StepResult, StepStatus};
use weld_plugin::{Plugin, PluginContext, PluginError};

use crate::payload::decode;
use crate::render::render_template;

#[derive(Deserialize)]
struct Payload {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    cwd: Option<String>,
    /// When set, the command is considered already applied if this path
    /// exists — otherwise a `command` step always runs on every apply.
    #[serde(default)]
    creates: Option<String>,
}

/// Runs an arbitrary program. Idempotence is the document author's
/// responsibility: declare `creates` to make a step skip once its
/// side effect is visible on disk, or accept that the command re-runs
/// every apply.
pub struct CommandPlugin;

impl Plugin for CommandPlugin {
    fn kind(&self) -> StepKind {
        StepKind::Command
    }

    fn validate_payload(&self, step: &Step) -> Result<(), PluginError> {
        decode::<Payload>(step).map(|_| ())
    }

    fn evaluate(&self, step: &Step, ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
        let p: Payload = decode(step)?;
        if let Some(marker) = &p.creates {
            let rendered = render_template(marker, ctx.vars(), false)
                .map_err(|m| PluginError::Execution { step_id: step.id.clone(), message: m })?;
            if ctx.resolve(&rendered).exists() {
                return Ok(EvaluationResult::satisfied(
                    &step.id,
                    format!("`{rendered}` already exists"),
                ));
            }
        }
        Ok(EvaluationResult {
            step_id: step.id.clone(),
            current_state: CurrentState::Missing,
            requires_action: true,
            message: format!("would run `{}`", p.command),
            diff: None,
            internal_data: None,
        })
    }

    fn apply(
        &self,
        step: &Step,
        ctx: &PluginContext,
        _eval: &EvaluationResult,
    ) -> Result<StepResult, PluginError> {
        let p: Payload = decode(step)?;
        let render_err = |m: String| PluginError::Execution { step_id: step.id.clone(), message: m };

        let command = render_template(&p.command, ctx.vars(), false).map_err(render_err)?;
        let args = p
            .args
            .iter()
            .map(|a| render_template(a, ctx.vars(), false).map_err(render_err))
            .collect::<Result<Vec<_>, _>>()?;
        let cwd = match &p.cwd {
            Some(c) => Some(render_template(c, ctx.vars(), false).map_err(render_err)?),
            None => None,
        };

        let mut cmd = ProcessCommand::new(&command);
        cmd.args(&args);
        if let Some(cwd) = &cwd {
            cmd.current_dir(ctx.resolve(cwd));
        } else {
            cmd.current_dir(ctx.workdir());
        }

        let output = cmd.output().map_err(|e| PluginError::Execution {
            step_id: step.id.clone(),
            message: format!("failed to spawn `{command}`: {e}"),
        })?;

        if output.status.success() {
            Ok(StepResult {
                step_id: step.id.clone(),
                status: StepStatus::Success,
                message: format!("`{command}` exited 0"),
                duration: std::time::Duration::ZERO,
                timestamp: chrono::Utc::now(),
                error: None,
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            Err(PluginError::Execution {
                step_id: step.id.clone(),
                message: format!(
                    "`{command}` exited {}: {stderr}",
                    output.status.code().unwrap_or(-1)
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn step(command: &str, creates: Option<&str>) -> Step {
        let mut payload = json!({ "command": command, "args": [] });
        if let Some(c) = creates {
            payload["creates"] = json!(c);
        }
        Step {
            id: "s".into(),
            kind: StepKind::Command,
            name: None,
            depends_on: vec![],
            enabled: true,
            verify_timeout_seconds: None,
            payload,
        }
    }

    #[test]
    fn successful_command_reports_success() {
        let tmp = TempDir::new().unwrap();
        let ctx = PluginContext::new(tmp.path(), false);
        let s = step("true", None);
        let eval = CommandPlugin.evaluate(&s, &ctx).unwrap();
        let result = CommandPlugin.apply(&s, &ctx, &eval).unwrap();
        assert_eq!(result.status, StepStatus::Success);
    }

    #[test]
    fn failing_command_is_an_execution_error() {
        let tmp = TempDir::new().unwrap();
        let ctx = PluginContext::new(tmp.path(), false);
        let s = step("false", None);
        let eval = CommandPlugin.evaluate(&s, &ctx).unwrap();
        assert!(CommandPlugin.apply(&s, &ctx, &eval).is_err());
    }

    #[test]
    fn creates_marker_short_circuits_evaluate() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("marker"), "").unwrap();
        let ctx = PluginContext::new(tmp.path(), false);
        let s = step("false", Some("marker"));
        let eval = CommandPlugin.evaluate(&s, &ctx).unwrap();
        assert!(!eval.requires_action);
    }
}
