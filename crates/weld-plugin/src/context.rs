use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Everything a plugin needs to mediate side effects, handed in explicitly
/// by the executor rather than reached for via globals.
#[derive(Debug, Clone)]
pub struct PluginContext {
    workdir: PathBuf,
    dry_run: bool,
    vars: BTreeMap<String, String>,
}

impl PluginContext {
    pub fn new(workdir: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            workdir: workdir.into(),
            dry_run,
            vars: BTreeMap::new(),
        }
    }

    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Resolve a path a plugin declared relative to the run's working
    /// directory. Absolute paths pass through unchanged.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        let p = Path::new(rel);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.workdir.join(p)
        }
    }
}
