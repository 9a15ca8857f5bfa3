//! `--resume` support: skip steps whose declared `dest` already matches the
//! checksum recorded from a previous apply. Only compiled when `weld-dag`'s
//! `incremental` feature is on; `main.rs` rejects `--resume` otherwise.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use weld_dag::{checksum, ArtifactStore};
use weld_exec::ApplyReport;
use weld_model::{Document, StepStatus};

fn store_path(workdir: &Path) -> PathBuf {
    workdir.join(".weld-resume.json")
}

pub fn load(workdir: &Path) -> Result<ArtifactStore> {
    let path = store_path(workdir);
    if !path.exists() {
        return Ok(ArtifactStore::new());
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn save(workdir: &Path, store: &ArtifactStore) -> Result<()> {
    let path = store_path(workdir);
    std::fs::write(&path, serde_json::to_vec_pretty(store)?)
        .with_context(|| format!("writing {}", path.display()))
}

/// A step's declared destination path, whichever of the two field names
/// its plugin uses for it (`copy`/`symlink` use `dest`, `repo`/`template`
/// use `destination`).
fn payload_destination(payload: &serde_json::Value) -> Option<&str> {
    payload
        .get("destination")
        .or_else(|| payload.get("dest"))
        .and_then(|v| v.as_str())
}

/// Ids of enabled steps whose declared destination the store considers
/// already converged. Only step kinds that declare one participate —
/// everything else always runs.
pub fn skippable(doc: &Document, workdir: &Path, store: &ArtifactStore) -> HashSet<String> {
    doc.enabled_steps()
        .filter_map(|step| {
            let dest = payload_destination(&step.payload)?;
            store
                .should_skip(&step.id, &workdir.join(dest))
                .then(|| step.id.clone())
        })
        .collect()
}

/// Disables every step named in `skip` so the DAG builder drops it from the
/// plan the same way it drops any other disabled step.
pub fn disable(mut doc: Document, skip: &HashSet<String>) -> Document {
    for step in doc.steps.iter_mut() {
        if skip.contains(&step.id) {
            step.enabled = false;
        }
    }
    doc
}

/// Records a fresh checksum for every step that ran and succeeded with a
/// declared `dest`, so a later `--resume` run can skip it again.
pub fn record_results(doc: &Document, workdir: &Path, report: &ApplyReport, store: &mut ArtifactStore) {
    for result in &report.results {
        if result.status != StepStatus::Success {
            continue;
        }
        let Some(step) = doc.step(&result.step_id) else { continue };
        let Some(dest) = payload_destination(&step.payload) else { continue };
        if let Ok(bytes) = std::fs::read(workdir.join(dest)) {
            store.record(&step.id, checksum(&bytes));
        }
    }
}
