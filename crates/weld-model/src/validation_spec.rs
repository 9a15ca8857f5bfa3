use serde::{Deserialize, Serialize};

/// A post-run assertion checked against the live system after an apply run
/// completes. These are independent of any step kind and exist purely to
/// give a document author a final sanity check over the converged state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationSpec {
    CommandExists { command: String },
    FileExists { path: String },
    PathContains { file: String, text: String },
}

impl ValidationSpec {
    pub fn describe(&self) -> String {
        match self {
            ValidationSpec::CommandExists { command } => format!("command `{command}` exists on PATH"),
            ValidationSpec::FileExists { path } => format!("file `{path}` exists"),
            ValidationSpec::PathContains { file, text } => {
                format!("file `{file}` contains `{text}`")
            }
        }
    }
}
