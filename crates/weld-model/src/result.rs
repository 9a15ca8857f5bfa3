use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a step's evaluation found the live system relative to its declared
/// intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentState {
    /// Live state already matches the declared intent; nothing to do.
    Satisfied,
    /// The thing the step describes does not exist yet.
    Missing,
    /// It exists but differs from the declared intent.
    Drifted,
    /// A dependency was not satisfied, so this step was never evaluated.
    Blocked,
    /// The plugin could not determine state (e.g. a command errored).
    Unknown,
}

/// Output of a plugin's read-only `evaluate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub step_id: String,
    pub current_state: CurrentState,
    /// True when `apply` would need to do work to converge this step.
    pub requires_action: bool,
    pub message: String,
    /// Optional human-readable diff between declared and live state.
    pub diff: Option<String>,
    /// Opaque data a plugin wants handed back to its own `apply` call, so
    /// it doesn't need to re-derive what it already found during evaluate.
    pub internal_data: Option<serde_json::Value>,
}

impl EvaluationResult {
    pub fn satisfied(step_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            current_state: CurrentState::Satisfied,
            requires_action: false,
            message: message.into(),
            diff: None,
            internal_data: None,
        }
    }
}

/// Terminal outcome of applying (or skipping) a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
    /// Dry-run only: the step was evaluated but never applied.
    WouldCreate,
    WouldUpdate,
}

impl StepStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed)
    }
}

/// Record of what happened when a step was executed (or would have been,
/// in dry-run mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    pub message: String,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl StepResult {
    pub fn skipped(step_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Skipped,
            message: reason.into(),
            duration: Duration::ZERO,
            timestamp: Utc::now(),
            error: None,
        }
    }
}

/// Result of a read-only verification walk over a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub step_id: String,
    pub status: CurrentState,
    pub message: String,
    pub details: Option<String>,
}

/// Aggregate tally produced by a full verify run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total_steps: usize,
    pub satisfied: usize,
    pub missing: usize,
    pub drifted: usize,
    pub blocked: usize,
    pub unknown: usize,
    pub results: Vec<VerificationResult>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl VerificationSummary {
    /// A verify run is considered clean only when every step reported
    /// `Satisfied` — anything else (including `Blocked`/`Unknown`) means
    /// the system has not fully converged.
    pub fn is_converged(&self) -> bool {
        self.total_steps > 0 && self.satisfied == self.total_steps
    }

    pub fn record(&mut self, result: VerificationResult) {
        match result.status {
            CurrentState::Satisfied => self.satisfied += 1,
            CurrentState::Missing => self.missing += 1,
            CurrentState::Drifted => self.drifted += 1,
            CurrentState::Blocked => self.blocked += 1,
            CurrentState::Unknown => self.unknown += 1,
        }
        self.total_steps += 1;
        self.results.push(result);
    }
}

impl Default for VerificationSummary {
    fn default() -> Self {
        Self {
            total_steps: 0,
            satisfied: 0,
            missing: 0,
            drifted: 0,
            blocked: 0,
            unknown: 0,
            results: Vec::new(),
            duration: Duration::ZERO,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
