use std::process::Command as ProcessCommand;

use serde::Deserialize;

use weld_model::{CurrentState, EvaluationResult, Step, StepKind, StepResult, StepStatus};
use weld_plugin::{Plugin, PluginContext, PluginError};

use crate::payload::decode;

#[derive(Deserialize)]
struct Payload {
    name: String,
    #[serde(default = "default_manager")]
    manager: String,
    #[serde(default = "default_present")]
    state: String,
}

fn default_manager() -> String {
    "apt".to_string()
}

fn default_present() -> String {
    "present".to_string()
}

/// Installs (or removes) an OS package via a package manager's query and
/// install subcommands. Only `apt` and `brew` are wired up; any other
/// `manager` value fails payload validation rather than silently no-op'ing.
pub struct PackagePlugin;

impl PackagePlugin {
    fn query_cmd(manager: &str, name: &str) -> Option<(String, Vec<String>)> {
        match manager {
            "apt" => Some(("dpkg-query".into(), vec!["-W".into(), "-f=${Status}".into(), name.into()])),
            "brew" => Some(("brew".into(), vec!["list".into(), name.into()])),
            _ => None,
        }
    }

    fn install_cmd(manager: &str, name: &str) -> Option<(String, Vec<String>)> {
        match manager {
            "apt" => Some(("apt-get".into(), vec!["install".into(), "-y".into(), name.into()])),
            "brew" => Some(("brew".into(), vec!["install".into(), name.into()])),
            _ => None,
        }
    }

    fn remove_cmd(manager: &str, name: &str) -> Option<(String, Vec<String>)> {
        match manager {
            "apt" => Some(("apt-get".into(), vec!["remove".into(), "-y".into(), name.into()])),
            "brew" => Some(("brew".into(), vec!["uninstall".into(), name.into()])),
            _ => None,
        }
    }
}

impl Plugin for PackagePlugin {
    fn kind(&self) -> StepKind {
        StepKind::Package
    }

    fn validate_payload(&self, step: &Step) -> Result<(), PluginError> {
        let p: Payload = decode(step)?;
        if Self::install_cmd(&p.manager, &p.name).is_none() {
            return Err(PluginError::InvalidPayload {
                step_id: step.id.clone(),
                kind: step.kind,
                message: format!("unsupported package manager `{}`", p.manager),
            });
        }
        if p.state != "present" && p.state != "absent" {
            return Err(PluginError::InvalidPayload {
                step_id: step.id.clone(),
                kind: step.kind,
                message: format!("state must be `present` or `absent`, got `{}`", p.state),
            });
        }
        Ok(())
    }

    fn evaluate(&self, step: &Step, _ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
        let p: Payload = decode(step)?;
        let (prog, args) = Self::query_cmd(&p.manager, &p.name)
            .expect("validate_payload already checked the manager is supported");

        let installed = ProcessCommand::new(prog)
            .args(args)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);

        let wants_present = p.state == "present";
        if installed == wants_present {
            return Ok(EvaluationResult::satisfied(
                &step.id,
                format!("`{}` already {}", p.name, p.state),
            ));
        }

        Ok(EvaluationResult {
            step_id: step.id.clone(),
            current_state: if wants_present { CurrentState::Missing } else { CurrentState::Drifted },
            requires_action: true,
            message: format!(
                "`{}` is {} but should be {}",
                p.name,
                if installed { "present" } else { "absent" },
                p.state
            ),
            diff: None,
            internal_data: None,
        })
    }

    fn apply(
        &self,
        step: &Step,
        _ctx: &PluginContext,
        _eval: &EvaluationResult,
    ) -> Result<StepResult, PluginError> {
        let p: Payload = decode(step)?;
        let (prog, args) = if p.state == "present" {
            Self::install_cmd(&p.manager, &p.name)
        } else {
            Self::remove_cmd(&p.manager, &p.name)
        }
        .expect("validate_payload already checked the manager is supported");

        let output = ProcessCommand::new(&prog).args(&args).output().map_err(|e| {
            PluginError::Execution {
                step_id: step.id.clone(),
                message: format!("failed to spawn `{prog}`: {e}"),
            }
        })?;

        if output.status.success() {
            Ok(StepResult {
                step_id: step.id.clone(),
                status: StepStatus::Success,
                message: format!("`{}` is now {}", p.name, p.state),
                duration: std::time::Duration::ZERO,
                timestamp: chrono::Utc::now(),
                error: None,
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            Err(PluginError::Execution {
                step_id: step.id.clone(),
                message: format!("`{prog}` failed: {stderr}"),
            })
        }
    }
}
