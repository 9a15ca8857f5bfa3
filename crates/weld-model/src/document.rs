use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::settings::Settings;
use crate::step::Step;
use crate::validation_spec::ValidationSpec;

/// The top-level convergence document: a name, run settings, the ordered
/// list of declared steps, and optional post-run validations.
///
/// Parsing here is purely structural — `Document::from_yaml`/`from_json`
/// succeed as soon as the text deserializes into this shape. Whether the
/// document makes semantic sense (no duplicate step ids, no dangling
/// dependencies, no cycles) is decided downstream by a validator that
/// borrows a `&Document`; this crate has no opinion on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub version: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub settings: Settings,

    pub steps: Vec<Step>,

    #[serde(default)]
    pub validations: Option<Vec<ValidationSpec>>,
}

impl Document {
    pub fn from_yaml(yaml: &str) -> Result<Self, ModelError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up a step by id, in declaration order.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps with `enabled: true`, the only ones a scheduler ever plans.
    pub fn enabled_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let yaml = r#"
version: "1"
name: example
steps:
  - id: a
    kind: command
    command: "true"
"#;
        let doc = Document::from_yaml(yaml).expect("should parse");
        assert_eq!(doc.name, "example");
        assert_eq!(doc.steps.len(), 1);
        assert!(doc.steps[0].enabled);
    }

    #[test]
    fn rejects_malformed_yaml() {
        let yaml = "not: [valid";
        assert!(Document::from_yaml(yaml).is_err());
    }

    #[test]
    fn enabled_steps_filters_disabled() {
        let yaml = r#"
version: "1"
name: example
steps:
  - id: a
    kind: command
    command: "true"
  - id: b
    kind: command
    command: "false"
    enabled: false
"#;
        let doc = Document::from_yaml(yaml).unwrap();
        let ids: Vec<_> = doc.enabled_steps().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }
}
