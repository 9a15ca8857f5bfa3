//! Checksum-based incremental tracking, used by `weld-cli --resume` to skip
//! steps whose declared output already matches what a previous run left
//! behind.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Status of a tracked artifact, mirroring the lifecycle a step's declared
/// output moves through across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Missing,
    Ready,
    Invalidated,
}

/// A single tracked artifact: the output a step is declared to produce,
/// plus the checksum recorded the last time that step applied cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub step_id: String,
    pub checksum: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub status: ArtifactStatus,
}

impl Artifact {
    pub fn missing(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            checksum: None,
            recorded_at: None,
            status: ArtifactStatus::Missing,
        }
    }

    pub fn mark_ready(&mut self, checksum: String) {
        self.checksum = Some(checksum);
        self.recorded_at = Some(Utc::now());
        self.status = ArtifactStatus::Ready;
    }

    pub fn invalidate(&mut self) {
        self.status = ArtifactStatus::Invalidated;
    }

    pub fn needs_rebuild(&self) -> bool {
        matches!(self.status, ArtifactStatus::Missing | ArtifactStatus::Invalidated)
    }
}

/// The set of artifacts recorded from a previous run, loaded by the
/// resume flag to decide which steps can be skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactStore {
    artifacts: BTreeMap<String, Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step_id: &str, checksum: String) {
        self.artifacts
            .entry(step_id.to_string())
            .or_insert_with(|| Artifact::missing(step_id))
            .mark_ready(checksum);
    }

    pub fn invalidate(&mut self, step_id: &str) {
        if let Some(a) = self.artifacts.get_mut(step_id) {
            a.invalidate();
        }
    }

    /// True when the given file's current contents hash to the checksum
    /// recorded for `step_id` during a previous run.
    pub fn should_skip(&self, step_id: &str, output_path: &Path) -> bool {
        let Some(artifact) = self.artifacts.get(step_id) else {
            return false;
        };
        if artifact.needs_rebuild() {
            return false;
        }
        let Some(expected) = &artifact.checksum else {
            return false;
        };
        let Ok(bytes) = std::fs::read(output_path) else {
            return false;
        };
        &checksum(&bytes) == expected
    }
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn unrecorded_step_is_never_skipped() {
        let store = ArtifactStore::new();
        let f = NamedTempFile::new().unwrap();
        assert!(!store.should_skip("a", f.path()));
    }

    #[test]
    fn matching_checksum_allows_skip() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();
        let mut store = ArtifactStore::new();
        store.record("a", checksum(b"hello"));
        assert!(store.should_skip("a", f.path()));
    }

    #[test]
    fn changed_content_forces_rebuild() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"changed").unwrap();
        let mut store = ArtifactStore::new();
        store.record("a", checksum(b"hello"));
        assert!(!store.should_skip("a", f.path()));
    }

    #[test]
    fn invalidated_artifact_forces_rebuild() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();
        let mut store = ArtifactStore::new();
        store.record("a", checksum(b"hello"));
        store.invalidate("a");
        assert!(!store.should_skip("a", f.path()));
    }
}
