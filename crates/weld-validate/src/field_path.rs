use std::fmt;

/// A dotted path pointing at the offending part of a document, e.g.
/// `steps[2].depends_on[0]`, attached to validation errors so a caller can
/// point a user at the exact spot without re-deriving it from a message
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn steps() -> Self {
        Self("steps".to_string())
    }

    pub fn step(index: usize) -> Self {
        Self(format!("steps[{index}]"))
    }

    pub fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{name}", self.0))
        }
    }

    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{i}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<document>")
        } else {
            f.write_str(&self.0)
        }
    }
}
