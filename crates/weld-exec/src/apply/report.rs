use serde::Serialize;
use uuid::Uuid;
use weld_model::StepResult;

/// Outcome of a full apply run across every level of a plan. `run_id`
/// identifies this run in the manifest written to disk, so a caller can
/// correlate it against logs from the same run.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub run_id: Uuid,
    pub results: Vec<StepResult>,
    pub cancelled: bool,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            results: Vec::new(),
            cancelled: false,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status.is_failure())
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && !self.has_failures()
    }
}

impl Default for ApplyReport {
    fn default() -> Self {
        Self::new()
    }
}
