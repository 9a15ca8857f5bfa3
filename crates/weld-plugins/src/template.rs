use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use weld_model::{CurrentState, EvaluationResult, Step, StepKind, StepResult, StepStatus};
use weld_plugin::{Plugin, PluginContext, PluginError};

use crate::payload::decode;
use crate::render::render_template;

#[derive(Deserialize)]
struct Payload {
    source: String,
    destination: String,
    #[serde(default)]
    vars: BTreeMap<String, String>,
    #[serde(default = "default_env")]
    env: bool,
    #[serde(default)]
    allow_missing: bool,
    #[serde(default)]
    mode: Option<u32>,
}

fn default_env() -> bool {
    true
}

fn is_valid_var_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()).is_match(name)
}

/// Renders the `{{var}}` placeholders in a source file and writes the
/// result to `destination`. Step-local `vars` override run-level vars of
/// the same name, which in turn override OS environment variables when
/// `env` is true (the default).
pub struct TemplatePlugin;

impl TemplatePlugin {
    fn merged_vars(ctx: &PluginContext, p: &Payload) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        if p.env {
            merged.extend(std::env::vars());
        }
        merged.extend(ctx.vars().clone());
        merged.extend(p.vars.clone());
        merged
    }

    /// Reads and renders the source template. Callers classify a failure
    /// according to when it happened: during `evaluate` it means the
    /// current state couldn't be determined, during `apply` it means the
    /// action itself failed.
    fn render(ctx: &PluginContext, p: &Payload) -> Result<String, String> {
        let src = ctx.resolve(&p.source);
        let text = std::fs::read_to_string(&src).map_err(|e| format!("cannot read template `{}`: {e}", p.source))?;
        render_template(&text, &Self::merged_vars(ctx, p), p.allow_missing)
    }
}

impl Plugin for TemplatePlugin {
    fn kind(&self) -> StepKind {
        StepKind::Template
    }

    fn validate_payload(&self, step: &Step) -> Result<(), PluginError> {
        let p: Payload = decode(step)?;
        let source = p.source.trim();
        let destination = p.destination.trim();
        if source.is_empty() || destination.is_empty() {
            return Err(PluginError::InvalidPayload {
                step_id: step.id.clone(),
                kind: step.kind,
                message: "`source` and `destination` must both be non-blank".to_string(),
            });
        }
        if source == destination {
            return Err(PluginError::InvalidPayload {
                step_id: step.id.clone(),
                kind: step.kind,
                message: "`source` and `destination` must differ".to_string(),
            });
        }
        if let Some(bad) = p.vars.keys().find(|k| !is_valid_var_name(k)) {
            return Err(PluginError::InvalidPayload {
                step_id: step.id.clone(),
                kind: step.kind,
                message: format!("`{bad}` is not a valid variable name"),
            });
        }
        if let Some(mode) = p.mode {
            if mode > 0o777 {
                return Err(PluginError::InvalidPayload {
                    step_id: step.id.clone(),
                    kind: step.kind,
                    message: format!("`mode` must be in 0..0o777, got {mode:#o}"),
                });
            }
        }
        Ok(())
    }

    fn evaluate(&self, step: &Step, ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
        let p: Payload = decode(step)?;
        let rendered = Self::render(ctx, &p).map_err(|message| PluginError::State {
            step_id: step.id.clone(),
            message,
        })?;
        let dest = ctx.resolve(&p.destination);

        match std::fs::read_to_string(&dest) {
            Ok(existing) if existing == rendered => {
                Ok(EvaluationResult::satisfied(&step.id, format!("`{}` already rendered", p.destination)))
            }
            Ok(_) => Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Drifted,
                requires_action: true,
                message: format!("`{}` content differs from rendered template", p.destination),
                diff: None,
                internal_data: Some(serde_json::json!({ "rendered": rendered })),
            }),
            Err(_) => Ok(EvaluationResult {
                step_id: step.id.clone(),
                current_state: CurrentState::Missing,
                requires_action: true,
                message: format!("`{}` does not exist", p.destination),
                diff: None,
                internal_data: Some(serde_json::json!({ "rendered": rendered })),
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
        let rendered = match eval.internal_data.as_ref().and_then(|d| d.get("rendered")).and_then(|v| v.as_str()) {
            Some(cached) => cached.to_string(),
            None => Self::render(ctx, &p).map_err(|message| PluginError::Execution {
                step_id: step.id.clone(),
                message,
            })?,
        };

        let dest = ctx.resolve(&p.destination);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PluginError::Execution {
                step_id: step.id.clone(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(&dest, &rendered).map_err(|e| PluginError::Execution {
            step_id: step.id.clone(),
            message: e.to_string(),
        })?;

        #[cfg(unix)]
        if let Some(mode) = p.mode {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(mode)).map_err(|e| {
                PluginError::Execution {
                    step_id: step.id.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(StepResult {
            step_id: step.id.clone(),
            status: StepStatus::Success,
            message: format!("rendered `{}` -> `{}`", p.source, p.destination),
            duration: std::time::Duration::ZERO,
            timestamp: chrono::Utc::now(),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn step(vars: serde_json::Value) -> Step {
        let mut payload = json!({ "source": "t.tmpl", "destination": "out.txt", "env": false });
        payload["vars"] = vars;
        Step {
            id: "s".into(),
            kind: StepKind::Template,
            name: None,
            depends_on: vec![],
            enabled: true,
            verify_timeout_seconds: None,
            payload,
        }
    }

    #[test]
    fn renders_with_step_vars_and_applies() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("t.tmpl"), "hello {{name}}").unwrap();
        let ctx = PluginContext::new(tmp.path(), false);
        let s = step(json!({ "name": "world" }));

        let eval = TemplatePlugin.evaluate(&s, &ctx).unwrap();
        assert!(eval.requires_action);
        TemplatePlugin.apply(&s, &ctx, &eval).unwrap();
        assert_eq!(std::fs::read_to_string(tmp.path().join("out.txt")).unwrap(), "hello world");

        let eval2 = TemplatePlugin.evaluate(&s, &ctx).unwrap();
        assert!(!eval2.requires_action);
    }

    #[test]
    fn step_vars_override_run_vars() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("t.tmpl"), "hello {{name}}").unwrap();
        let mut run_vars = BTreeMap::new();
        run_vars.insert("name".to_string(), "run-level".to_string());
        let ctx = PluginContext::new(tmp.path(), false).with_vars(run_vars);
        let s = step(json!({ "name": "step-level" }));

        let eval = TemplatePlugin.evaluate(&s, &ctx).unwrap();
        TemplatePlugin.apply(&s, &ctx, &eval).unwrap();
        assert_eq!(std::fs::read_to_string(tmp.path().join("out.txt")).unwrap(), "hello step-level");
    }

    #[test]
    fn rejects_blank_or_identical_source_and_destination() {
        let mut payload = json!({ "source": "t.tmpl", "destination": "t.tmpl" });
        payload["vars"] = json!({});
        let s = Step {
            id: "s".into(),
            kind: StepKind::Template,
            name: None,
            depends_on: vec![],
            enabled: true,
            verify_timeout_seconds: None,
            payload,
        };
        assert!(TemplatePlugin.validate_payload(&s).is_err());
    }

    #[test]
    fn rejects_invalid_variable_names() {
        let s = step(json!({ "1bad": "x" }));
        assert!(TemplatePlugin.validate_payload(&s).is_err());
    }

    #[test]
    fn allow_missing_leaves_unset_placeholders_verbatim() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("t.tmpl"), "hello {{who}}").unwrap();
        let ctx = PluginContext::new(tmp.path(), false);
        let mut payload = json!({ "source": "t.tmpl", "destination": "out.txt", "env": false, "allow_missing": true });
        payload["vars"] = json!({});
        let s = Step {
            id: "s".into(),
            kind: StepKind::Template,
            name: None,
            depends_on: vec![],
            enabled: true,
            verify_timeout_seconds: None,
            payload,
        };

        let eval = TemplatePlugin.evaluate(&s, &ctx).unwrap();
        TemplatePlugin.apply(&s, &ctx, &eval).unwrap();
        assert_eq!(std::fs::read_to_string(tmp.path().join("out.txt")).unwrap(), "hello {{who}}");
    }
}
