use serde::{Deserialize, Serialize};

/// Global run settings controlling worker-pool size, timeouts, and run mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Worker-pool size; within-level concurrency. 1..32, default 4.
    #[serde(default = "default_parallel")]
    pub parallel: u32,

    /// Per-step timeout, applied when > 0. 1..360000.
    #[serde(default)]
    pub timeout_seconds: u64,

    /// When true, a level failure does not abort the remaining levels.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Read-only preview mode, also selectable at invocation time.
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub verbose: bool,
}

fn default_parallel() -> u32 {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            timeout_seconds: 0,
            continue_on_error: false,
            dry_run: false,
            verbose: false,
        }
    }
}
