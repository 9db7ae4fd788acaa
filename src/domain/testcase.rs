use serde::{Deserialize, Serialize};

/// Test categories the front-end lets the user request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TestCategory {
    Positive,
    Negative,
    Edge,
}

impl TestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::Positive => "Positive",
            TestCategory::Negative => "Negative",
            TestCategory::Edge => "Edge",
        }
    }
}

/// One test case as the model returns it. Every field defaults so that a
/// sparse object still produces a row instead of a parse failure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TestCase {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub preconditions: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default)]
    pub priority: String,
}

/// Flattened table row handed to the front-end. Steps are newline-joined.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TestCaseRow {
    pub id: String,
    pub category: String,
    pub title: String,
    pub preconditions: String,
    pub steps: String,
    pub expected_result: String,
    pub priority: String,
}

impl TestCaseRow {
    /// `position` is the 1-based index of the case in the reply; it only
    /// feeds the placeholder id when the model omitted one.
    pub fn from_case(case: &TestCase, position: usize) -> Self {
        let id = match case.id.as_ref() {
            Some(id) => id.clone(),
            None => format!("TC-{:03}", position),
        };
        Self {
            id,
            category: case.category.clone(),
            title: case.title.clone(),
            preconditions: case.preconditions.clone(),
            steps: case.steps.join("\n"),
            expected_result: case.expected_result.clone(),
            priority: case.priority.clone(),
        }
    }
}
