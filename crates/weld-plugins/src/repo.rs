use std::process::Command as ProcessCommand;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use weld_model::{CurrentState, EvaluationResult, Step, StepKind, StepResult, StepStatus};
use weld_plugin::{Plugin, PluginContext, PluginError};

use crate::payload::decode;

#[derive(Deserialize)]
struct Payload {
    url: String,
    destination: String,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    depth: Option<u32>,
}

/// `url` must be http(s), an SSH-style `user@host:path`, or a local path
/// (absolute, or starting with `./`/`../`); NUL bytes, a `/../` infix, and
/// a trailing `/..` are all rejected regardless of which form it takes.
fn is_valid_repo_url(url: &str) -> bool {
    if url.contains('\0') || url.contains("/../") || url.ends_with("/..") {
        return false;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return true;
    }

    static SSH: OnceLock<Regex> = OnceLock::new();
    let ssh = SSH.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+@[A-Za-z0-9_.-]+:.+$").unwrap());
    if ssh.is_match(url) {
        return true;
    }

    url.starts_with('/') || url.starts_with("./") || url.starts_with("../")
}

/// Clones a git repository, or pulls it if `destination` already holds a
/// clone of the same `url`.
pub struct RepoPlugin;

impl Plugin for RepoPlugin {
    fn kind(&self) -> StepKind {
        StepKind::Repo
    }

    fn validate_payload(&self, step: &Step) -> Result<(), PluginError> {
        let p: Payload = decode(step)?;
        if !is_valid_repo_url(&p.url) {
            return Err(PluginError::InvalidPayload {
                step_id: step.id.clone(),
                kind: step.kind,
                message: format!("`{}` is not a valid repo url", p.url),
            });
        }
        Ok(())
    }

    fn evaluate(&self, step: &Step, ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
        let p: Payload = decode(step)?;
        let dest = ctx.resolve(&p.destination);
        if !dest.join(".git").is_dir() {
            return Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Missing,
                requires_action: true,
                message: format!("`{}` is not yet cloned", p.destination),
                diff: None,
                internal_data: None,
            });
        }

        let remote = ProcessCommand::new("git")
            .args(["-C", &dest.to_string_lossy(), "remote", "get-url", "origin"])
            .output()
            .ok()
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

        match remote {
            Some(url) if url == p.url => {
                Ok(EvaluationResult::satisfied(&step.id, format!("`{}` already cloned", p.destination)))
            }
            _ => Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Drifted,
                requires_action: true,
                message: format!("`{}` origin does not match declared url", p.destination),
                diff: None,
                internal_data: None,
            }),
        }
    }

    fn apply(
        &self,
        step: &Step,
        ctx: &PluginContext,
        eval: &EvaluationResult,
    ) -> Result<StepResult, PluginError> {
        let p: Payload = decode(step)?;
        let dest = ctx.resolve(&p.destination);

        let mut cmd = if matches!(eval.current_state, CurrentState::Missing) {
            let mut c = ProcessCommand::new("git");
            c.arg("clone");
            if let Some(branch) = &p.branch {
                c.args(["--branch", branch]);
            }
            if let Some(depth) = p.depth {
                c.args(["--depth", &depth.to_string()]);
            }
            c.args([&p.url, &dest.to_string_lossy()]);
            c
        } else {
            let mut c = ProcessCommand::new("git");
            c.args(["-C", &dest.to_string_lossy(), "pull"]);
            c
        };

        let output = cmd.output().map_err(|e| PluginError::Execution {
            step_id: step.id.clone(),
            message: format!("failed to spawn git: {e}"),
        })?;

        if output.status.success() {
            Ok(StepResult {
                step_id: step.id.clone(),
                status: StepStatus::Success,
                message: format!("`{}` converged", p.destination),
                duration: std::time::Duration::ZERO,
                timestamp: chrono::Utc::now(),
                error: None,
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            Err(PluginError::Execution {
                step_id: step.id.clone(),
                message: format!("git failed: {stderr}"),
            })
        }
    }
}
