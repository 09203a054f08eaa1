use super::Value;
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// A place in a table a value was read from: a whole column, or one cell
/// when `row` is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExplanationLocation {
    pub table: String,
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

impl ExplanationLocation {
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            row: None,
        }
    }

    pub fn cell(table: impl Into<String>, column: impl Into<String>, row: usize) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            row: Some(row),
        }
    }

    /// The cell at `row` of this location's column.
    pub fn with_row(&self, row: usize) -> Self {
        Self {
            row: Some(row),
            ..self.clone()
        }
    }
}

/// How a value was computed.
///
/// Each node records the step that produced `result`, the table locations
/// it read directly and the explanations of its inputs. `result_is` is set
/// when the result is not a new value but exactly the value stored at some
/// location, so a front-end can link to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub description: String,
    pub result: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub used_locations: Vec<ExplanationLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_is: Option<ExplanationLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Explanation>,
}

impl Explanation {
    pub fn new(description: impl Into<String>, result: Value) -> Self {
        Self {
            description: description.into(),
            result,
            used_locations: Vec::new(),
            result_is: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Explanation>) -> Self {
        self.children = children;
        self
    }

    /// Every location used anywhere in this explanation, depth first.
    pub fn all_locations(&self) -> Vec<&ExplanationLocation> {
        let mut out: Vec<&ExplanationLocation> = self.used_locations.iter().collect();
        out.extend(self.result_is.iter());
        for child in &self.children {
            out.extend(child.all_locations());
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// A value together with the explanation of how it was obtained.
///
/// Equality and hashing only look at `value`.
#[derive(Debug, Clone, Serialize)]
pub struct Recorded<T> {
    pub value: T,
    pub explanation: Explanation,
}

impl<T> Recorded<T> {
    pub fn new(value: T, explanation: Explanation) -> Self {
        Self { value, explanation }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: PartialEq> PartialEq for Recorded<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Recorded<T> {}

impl<T: Hash> Hash for Recorded<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}
