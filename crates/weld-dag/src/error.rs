use thiserror::Error;

/// Errors raised while turning a set of steps into a `Plan`.
///
/// Both variants are also caught earlier by `weld-validate`; `weld-dag`
/// re-checks them independently so it stays usable on its own (a
/// `Plan::build` call is never unsound just because a caller skipped
/// validation), and because Kahn's algorithm surfaces a cycle for free as
/// a side effect of leveling rather than needing a second traversal.
#[derive(Debug, Error)]
pub enum DagError {
    #[error("step `{step}` depends on `{dep}`, which does not exist")]
    UnknownDependency { step: String, dep: String },

    #[error("dependency cycle among steps: {}", .steps.join(", "))]
    Cycle { steps: Vec<String> },
}
