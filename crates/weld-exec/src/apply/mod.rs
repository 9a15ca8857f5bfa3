mod report;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use weld_dag::{Graph, Plan};
use weld_model::{CurrentState, Document, Step, StepResult, StepStatus};
use weld_plugin::{PluginContext, Registry};

pub use report::ApplyReport;

use crate::error::ExecError;

/// Tunables for a single apply run, derived from a document's `Settings`
/// plus whatever the caller overrode on the command line.
#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    pub parallel: u32,
    pub continue_on_error: bool,
    pub dry_run: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            parallel: 4,
            continue_on_error: false,
            dry_run: false,
        }
    }
}

/// Converges a document's steps level by level: every step in a level
/// runs concurrently, bounded by a per-level semaphore sized to
/// `ExecOptions::parallel`, and the executor waits for the whole level to
/// finish before starting the next one.
pub struct Executor {
    registry: Arc<Registry>,
}

impl Executor {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub async fn apply(
        &self,
        doc: &Document,
        plan: &Plan,
        ctx: PluginContext,
        opts: ExecOptions,
        cancel: CancellationToken,
    ) -> Result<ApplyReport, ExecError> {
        let graph = Graph::build(doc)?;
        let mut report = ApplyReport::new();
        let mut blocked: HashSet<String> = HashSet::new();
        let timeout_seconds = doc.settings.timeout_seconds;

        for level in plan.levels() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let semaphore = Arc::new(Semaphore::new((opts.parallel.max(1)) as usize));
            // Pre-sized and written by index rather than appended on task
            // completion, so the aggregate stays ordered by within-level
            // declaration position regardless of which task finishes first.
            let slots: Arc<Mutex<Vec<Option<StepResult>>>> = Arc::new(Mutex::new(vec![None; level.len()]));
            let mut set: JoinSet<usize> = JoinSet::new();

            for (pos, step_id) in level.iter().enumerate() {
                if blocked.contains(step_id) {
                    slots.lock().unwrap()[pos] =
                        Some(StepResult::skipped(step_id, "blocked by a failed dependency"));
                    continue;
                }

                let step = doc
                    .step(step_id)
                    .expect("a plan only ever names steps from its own document")
                    .clone();
                let registry = self.registry.clone();
                let ctx = ctx.clone();
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();
                let slots = slots.clone();
                let dry_run = opts.dry_run;

                set.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("semaphore is never closed while the level runs");
                    if cancel.is_cancelled() {
                        slots.lock().unwrap()[pos] = Some(StepResult::skipped(&step.id, "run cancelled"));
                        return pos;
                    }

                    let result = run_with_timeout(registry, step, ctx, dry_run, timeout_seconds).await;
                    slots.lock().unwrap()[pos] = Some(result);
                    pos
                });
            }

            let mut level_failed = false;
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(pos) => {
                        let result = slots.lock().unwrap()[pos]
                            .clone()
                            .expect("a task always fills its own slot before returning");
                        if result.status.is_failure() {
                            level_failed = true;
                            warn!(step_id = %result.step_id, "step failed, blocking dependents");
                            blocked.extend(graph.transitive_dependents(&result.step_id));
                        } else {
                            info!(step_id = %result.step_id, status = ?result.status, "step finished");
                        }
                    }
                    Err(join_err) => {
                        if join_err.is_panic() {
                            return Err(ExecError::Panicked(join_err.to_string()));
                        }
                        report.cancelled = true;
                    }
                }
            }

            let level_results = Arc::try_unwrap(slots)
                .expect("every clone was dropped once its task completed")
                .into_inner()
                .unwrap();
            report.results.extend(level_results.into_iter().flatten());

            if level_failed && !opts.continue_on_error {
                cancel.cancel();
                break;
            }
        }

        Ok(report)
    }
}

/// Runs one step's evaluate/apply on a blocking thread and, when
/// `timeout_seconds > 0`, races it against that deadline. A step that is
/// still running when the deadline elapses is abandoned on its blocking
/// thread and reported as a failed `"timeout exceeded"` step; it does not
/// block the rest of the level.
async fn run_with_timeout(
    registry: Arc<Registry>,
    step: Step,
    ctx: PluginContext,
    dry_run: bool,
    timeout_seconds: u64,
) -> StepResult {
    let step_id = step.id.clone();
    let started = Instant::now();
    let timestamp = Utc::now();

    let work = tokio::task::spawn_blocking(move || run_one(&registry, &step, &ctx, dry_run));

    let joined = if timeout_seconds > 0 {
        match tokio::time::timeout(Duration::from_secs(timeout_seconds), work).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                return StepResult {
                    step_id,
                    status: StepStatus::Failed,
                    message: "timeout exceeded".to_string(),
                    duration: started.elapsed(),
                    timestamp,
                    error: Some("timeout exceeded".to_string()),
                };
            }
        }
    } else {
        work.await
    };

    match joined {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
        Err(_cancelled) => StepResult::skipped(&step_id, "run cancelled"),
    }
}

fn run_one(registry: &Registry, step: &Step, ctx: &PluginContext, dry_run: bool) -> StepResult {
    let started = Instant::now();
    let timestamp = Utc::now();

    let plugin = match registry.get(step.kind) {
        Ok(p) => p,
        Err(e) => return failed(step, timestamp, started.elapsed(), e.to_string()),
    };

    let eval = match plugin.evaluate(step, ctx) {
        Ok(e) => e,
        Err(e) => return failed(step, timestamp, started.elapsed(), e.to_string()),
    };

    if !eval.requires_action {
        return StepResult {
            step_id: step.id.clone(),
            status: StepStatus::Success,
            message: eval.message,
            duration: started.elapsed(),
            timestamp,
            error: None,
        };
    }

    if dry_run {
        let status = if eval.current_state == CurrentState::Missing {
            StepStatus::WouldCreate
        } else {
            StepStatus::WouldUpdate
        };
        return StepResult {
            step_id: step.id.clone(),
            status,
            message: eval.message,
            duration: started.elapsed(),
            timestamp,
            error: None,
        };
    }

    match plugin.apply(step, ctx, &eval) {
        Ok(mut result) => {
            result.duration = started.elapsed();
            result
        }
        Err(e) => failed(step, timestamp, started.elapsed(), e.to_string()),
    }
}

fn failed(
    step: &Step,
    timestamp: chrono::DateTime<Utc>,
    duration: Duration,
    message: String,
) -> StepResult {
    StepResult {
        step_id: step.id.clone(),
        status: StepStatus::Failed,
        message: message.clone(),
        duration,
        timestamp,
        error: Some(message),
    }
}
