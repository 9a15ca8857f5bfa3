//! Turns a validated document and its `Plan` into live system state
//! (`apply`), or checks whether that state already matches the plan
//! without changing anything (`verify`).

pub mod apply;
pub mod error;
pub mod verify;

pub use apply::{ApplyReport, ExecOptions, Executor};
pub use error::ExecError;
pub use verify::{VerifyOutcome, Verifier};
