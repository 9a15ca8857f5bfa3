use serde::Deserialize;

use weld_model::{CurrentState, EvaluationResult, Step, StepKind, StepResult, StepStatus};
use weld_plugin::{Plugin, PluginContext, PluginError};

use crate::payload::decode;

#[derive(Deserialize)]
struct Payload {
    path: String,
    line: String,
    #[serde(default)]
    regex: Option<String>,
    #[serde(default = "default_present")]
    state: String,
    /// What to do when `regex` matches more than one line. `prompt` has no
    /// meaning in a headless run and is treated identically to `error`.
    #[serde(default = "default_on_multiple")]
    on_multiple_matches: String,
}

fn default_present() -> String {
    "present".to_string()
}

fn default_on_multiple() -> String {
    "error".to_string()
}

/// Ensures a single line is present in (or absent from) a file. When
/// `regex` is given, it identifies the line to replace or remove instead
/// of appending; a plain `line` step always matches itself literally.
pub struct LineInFilePlugin;

impl LineInFilePlugin {
    fn matching_lines<'a>(payload: &Payload, lines: &'a [&'a str]) -> Result<Vec<usize>, String> {
        match &payload.regex {
            Some(pattern) => {
                let re = regex::Regex::new(pattern).map_err(|e| format!("invalid regex `{pattern}`: {e}"))?;
                Ok(lines.iter().enumerate().filter(|(_, l)| re.is_match(l)).map(|(i, _)| i).collect())
            }
            None => Ok(lines
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == payload.line)
                .map(|(i, _)| i)
                .collect()),
        }
    }
}

impl Plugin for LineInFilePlugin {
    fn kind(&self) -> StepKind {
        StepKind::LineInFile
    }

    fn validate_payload(&self, step: &Step) -> Result<(), PluginError> {
        let p: Payload = decode(step)?;
        if p.state != "present" && p.state != "absent" {
            return Err(PluginError::InvalidPayload {
                step_id: step.id.clone(),
                kind: step.kind,
                message: format!("state must be `present` or `absent`, got `{}`", p.state),
            });
        }
        if let Some(pattern) = &p.regex {
            if regex::Regex::new(pattern).is_err() {
                return Err(PluginError::InvalidPayload {
                    step_id: step.id.clone(),
                    kind: step.kind,
                    message: format!("invalid regex `{pattern}`"),
                });
            }
        }
        Ok(())
    }

    fn evaluate(&self, step: &Step, ctx: &PluginContext) -> Result<EvaluationResult, PluginError> {
        let p: Payload = decode(step)?;
        let path = ctx.resolve(&p.path);
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        let lines: Vec<&str> = content.lines().collect();

        let matches = Self::matching_lines(&p, &lines).map_err(|m| PluginError::Execution {
            step_id: step.id.clone(),
            message: m,
        })?;

        if matches.len() > 1 {
            return Err(PluginError::Execution {
                step_id: step.id.clone(),
                message: format!(
                    "`{}` matched {} lines; on_multiple_matches=`{}` refuses to guess",
                    p.path,
                    matches.len(),
                    p.on_multiple_matches
                ),
            });
        }

        let present = !matches.is_empty();
        let wants_present = p.state == "present";
        if present == wants_present {
            return Ok(EvaluationResult::satisfied(&step.id, format!("`{}` already {}", p.path, p.state)));
        }

        Ok(EvaluationResult {
            step_id: step.id.clone(),
            current_state: CurrentState::Drifted,
            requires_action: true,
            message: format!("`{}` line should be {}", p.path, p.state),
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
        let path = ctx.resolve(&p.path);
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();

        let matches = Self::matching_lines(&p, &borrowed).map_err(|m| PluginError::Execution {
            step_id: step.id.clone(),
            message: m,
        })?;

        if p.state == "present" {
            match matches.first() {
                Some(&idx) => lines[idx] = p.line.clone(),
                None => lines.push(p.line.clone()),
            }
        } else {
            for &idx in matches.iter().rev() {
                lines.remove(idx);
            }
        }

        let mut new_content = lines.join("\n");
        if !new_content.is_empty() {
            new_content.push('\n');
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PluginError::Execution {
                step_id: step.id.clone(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(&path, &new_content).map_err(|e| PluginError::Execution {
            step_id: step.id.clone(),
            message: e.to_string(),
        })?;

        Ok(StepResult {
            step_id: step.id.clone(),
            status: StepStatus::Success,
            message: format!("`{}` line now {}", p.path, p.state),
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
    use std::io::Write;
    use tempfile::NamedTempFile;
    use weld_model::StepKind as SK;

    fn step(path: &str, line: &str, state: &str) -> Step {
        Step {
            id: "s".into(),
            kind: SK::LineInFile,
            name: None,
            depends_on: vec![],
            enabled: true,
            verify_timeout_seconds: None,
            payload: json!({ "path": path, "line": line, "state": state }),
        }
    }

    #[test]
    fn appends_missing_line() {
        let f = NamedTempFile::new().unwrap();
        let ctx = PluginContext::new(std::env::temp_dir(), false);
        let s = step(f.path().to_str().unwrap(), "export FOO=bar", "present");
        let plugin = LineInFilePlugin;
        let eval = plugin.evaluate(&s, &ctx).unwrap();
        assert!(eval.requires_action);
        plugin.apply(&s, &ctx, &eval).unwrap();
        let contents = std::fs::read_to_string(f.path()).unwrap();
        assert!(contents.contains("export FOO=bar"));
    }

    #[test]
    fn already_present_is_satisfied() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "export FOO=bar").unwrap();
        let ctx = PluginContext::new(std::env::temp_dir(), false);
        let s = step(f.path().to_str().unwrap(), "export FOO=bar", "present");
        let plugin = LineInFilePlugin;
        let eval = plugin.evaluate(&s, &ctx).unwrap();
        assert!(!eval.requires_action);
    }

    #[test]
    fn removes_line_when_absent() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "export FOO=bar").unwrap();
        writeln!(f, "export BAZ=qux").unwrap();
        let ctx = PluginContext::new(std::env::temp_dir(), false);
        let s = step(f.path().to_str().unwrap(), "export FOO=bar", "absent");
        let plugin = LineInFilePlugin;
        let eval = plugin.evaluate(&s, &ctx).unwrap();
        plugin.apply(&s, &ctx, &eval).unwrap();
        let contents = std::fs::read_to_string(f.path()).unwrap();
        assert!(!contents.contains("export FOO=bar"));
        assert!(contents.contains("export BAZ=qux"));
    }
}
