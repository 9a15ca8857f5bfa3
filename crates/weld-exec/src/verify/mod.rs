use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use weld_dag::{Graph, Plan};
use weld_model::{CurrentState, Document, EvaluationResult, Step, VerificationResult, VerificationSummary};
use weld_plugin::{Plugin, PluginContext, PluginError, Registry};

use crate::error::ExecError;

/// Outcome of a verify run. `summary` holds whatever was gathered before
/// the walk stopped; `error` is set when it stopped early because of a
/// fatal classification rather than reaching the end of the plan.
#[derive(Debug)]
pub struct VerifyOutcome {
    pub summary: VerificationSummary,
    pub error: Option<ExecError>,
}

/// Walks every step in plan order without ever calling `apply`, reporting
/// whether the live system already matches what each step declares.
///
/// Unlike `Executor::apply`, verification runs sequentially within a level
/// rather than concurrently — a verify run is meant to be a cheap, quiet
/// sanity check, not a race to finish, and sequential execution keeps its
/// output deterministic to read top to bottom.
pub struct Verifier<'a> {
    registry: &'a Registry,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// `default_step_timeout` bounds a step's `evaluate` call when the step
    /// itself declares no `verify_timeout_seconds`.
    pub fn verify(
        &self,
        doc: &Document,
        plan: &Plan,
        ctx: &PluginContext,
        cancel: &CancellationToken,
        default_step_timeout: Duration,
    ) -> Result<VerifyOutcome, weld_dag::DagError> {
        let started = Instant::now();
        let graph = Graph::build(doc)?;
        let mut summary = VerificationSummary::default();
        let mut statuses: HashMap<String, CurrentState> = HashMap::new();
        let mut outcome_error = None;

        'levels: for level in plan.levels() {
            for step_id in level {
                if cancel.is_cancelled() {
                    outcome_error = Some(ExecError::Cancelled);
                    break 'levels;
                }

                let step = graph
                    .step(step_id)
                    .expect("a plan only ever names steps from its own document");

                let unsatisfied: Vec<(&str, CurrentState)> = step
                    .depends_on
                    .iter()
                    .filter_map(|dep| match statuses.get(dep) {
                        Some(CurrentState::Satisfied) => None,
                        Some(status) => Some((dep.as_str(), *status)),
                        None => Some((dep.as_str(), CurrentState::Unknown)),
                    })
                    .collect();

                if !unsatisfied.is_empty() {
                    let message = format!(
                        "dependencies not satisfied: {}",
                        unsatisfied
                            .iter()
                            .map(|(id, status)| format!("{id} ({})", state_label(*status)))
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    record(&mut summary, &mut statuses, step.id.clone(), CurrentState::Blocked, message, None);
                    continue;
                }

                let plugin = match self.registry.get(step.kind) {
                    Ok(p) => p,
                    Err(e) => {
                        record(&mut summary, &mut statuses, step.id.clone(), CurrentState::Blocked, e.to_string(), None);
                        continue;
                    }
                };

                let timeout = step
                    .verify_timeout_seconds
                    .filter(|&t| t > 0)
                    .map(|t| Duration::from_secs(t as u64))
                    .unwrap_or(default_step_timeout);

                match evaluate_with_deadline(plugin, step.clone(), ctx.clone(), timeout) {
                    Ok(eval) => {
                        record(&mut summary, &mut statuses, step.id.clone(), eval.current_state, eval.message, eval.diff);
                    }
                    Err(PluginError::State { message, .. }) => {
                        record(&mut summary, &mut statuses, step.id.clone(), CurrentState::Unknown, message, None);
                    }
                    Err(other) => {
                        outcome_error = Some(ExecError::Plugin(other));
                        break 'levels;
                    }
                }
            }
        }

        summary.duration = started.elapsed();
        Ok(VerifyOutcome { summary, error: outcome_error })
    }
}

fn record(
    summary: &mut VerificationSummary,
    statuses: &mut HashMap<String, CurrentState>,
    step_id: String,
    status: CurrentState,
    message: String,
    details: Option<String>,
) {
    statuses.insert(step_id.clone(), status);
    summary.record(VerificationResult { step_id, status, message, details });
}

fn state_label(status: CurrentState) -> &'static str {
    match status {
        CurrentState::Satisfied => "satisfied",
        CurrentState::Missing => "missing",
        CurrentState::Drifted => "drifted",
        CurrentState::Blocked => "blocked",
        CurrentState::Unknown => "unknown",
    }
}

/// Runs one step's `evaluate` on its own thread and races it against
/// `timeout`. `evaluate` is synchronous and plugin-defined, so this is the
/// only way to bound it without requiring every plugin to cooperate with
/// cancellation itself; a step still running past the deadline is left to
/// finish on its own thread but its result is discarded.
fn evaluate_with_deadline(
    plugin: Arc<dyn Plugin>,
    step: Step,
    ctx: PluginContext,
    timeout: Duration,
) -> Result<EvaluationResult, PluginError> {
    let step_id = step.id.clone();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(plugin.evaluate(&step, &ctx));
    });

    rx.recv_timeout(timeout).unwrap_or(Err(PluginError::State {
        step_id,
        message: "timeout exceeded".to_string(),
    }))
}
