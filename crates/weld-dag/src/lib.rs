//! Dependency graph over a document's steps, the topological leveling
//! built from it, and the resulting execution `Plan` handed to an
//! executor.

#[cfg(feature = "incremental")]
pub mod artifact;
pub mod error;
pub mod graph;
pub mod plan;

pub use error::DagError;
pub use graph::Graph;
pub use plan::Plan;

#[cfg(feature = "incremental")]
pub use artifact::{checksum, Artifact, ArtifactStatus, ArtifactStore};
