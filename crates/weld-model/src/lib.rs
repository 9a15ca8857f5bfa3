//! Document, step, and result types for the weld convergence engine.
//!
//! This crate holds the typed domain model only: parsing a document into
//! these types, deciding whether it is *valid*, and turning it into an
//! execution plan are the responsibility of `weld-validate` and `weld-dag`.
//! Keeping the model crate free of those concerns lets tests construct
//! `Document`s directly without going through a validator.

pub mod document;
pub mod error;
pub mod result;
pub mod settings;
pub mod step;
pub mod validation_spec;

pub use document::Document;
pub use error::ModelError;
pub use result::{
    CurrentState, EvaluationResult, StepResult, StepStatus, VerificationResult,
    VerificationSummary,
};
pub use settings::Settings;
pub use step::{Step, StepKind};
pub use validation_spec::ValidationSpec;
