use serde::{Deserialize, Serialize};

/// A single declarative unit of work.
///
/// The base keys (`id`, `kind`, `name`, `depends_on`, `enabled`,
/// `verify_timeout_seconds`) are named fields; every remaining key in the
/// source document lands in `payload` via `#[serde(flatten)]`, which keeps
/// the payload from ever shadowing identity/metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,

    pub kind: StepKind,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub verify_timeout_seconds: Option<u32>,

    /// Kind-specific configuration. Decoded on demand by a plugin's
    /// `validate_payload`/`evaluate` via its own typed view.
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

/// The closed set of step kinds this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Package,
    Repo,
    Symlink,
    Copy,
    Command,
    Template,
    LineInFile,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Package => "package",
            StepKind::Repo => "repo",
            StepKind::Symlink => "symlink",
            StepKind::Copy => "copy",
            StepKind::Command => "command",
            StepKind::Template => "template",
            StepKind::LineInFile => "line_in_file",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
