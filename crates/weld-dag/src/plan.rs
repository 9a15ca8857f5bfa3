use weld_model::Document;

use crate::error::DagError;
use crate::graph::Graph;

/// An ordered set of execution levels ready to hand to an executor. Each
/// level is a list of step ids with no ordering relationship between them;
/// levels themselves must run in order since level N+1 depends on level N
/// having completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    levels: Vec<Vec<String>>,
}

impl Plan {
    pub fn build(doc: &Document) -> Result<Self, DagError> {
        let graph = Graph::build(doc)?;
        let levels = graph.levels()?;
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    pub fn step_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weld_model::{Settings, Step, StepKind};

    fn doc(steps: Vec<Step>) -> Document {
        Document {
            version: "1".into(),
            name: "t".into(),
            description: None,
            settings: Settings::default(),
            steps,
            validations: None,
        }
    }

    fn step(id: &str, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            kind: StepKind::Command,
            name: None,
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            enabled: true,
            verify_timeout_seconds: None,
            payload: json!({}),
        }
    }

    #[test]
    fn plan_step_count_matches_document() {
        let d = doc(vec![step("a", &[]), step("b", &["a"])]);
        let plan = Plan::build(&d).unwrap();
        assert_eq!(plan.step_count(), 2);
        assert_eq!(plan.levels().len(), 2);
    }

    #[test]
    fn empty_document_yields_empty_plan() {
        let d = doc(vec![]);
        let plan = Plan::build(&d).unwrap();
        assert!(plan.is_empty());
    }
}
