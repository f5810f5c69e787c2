//! Test request and result types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which tests a plugin wants to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestSubset {
    /// Every test in every test product.
    All,
    /// Tests whose `"<case>/<test>"` identifier matches at least one of the
    /// given regex patterns (search semantics, not full match). An empty
    /// pattern set selects nothing.
    Filtered { patterns: Vec<String> },
}

/// A plugin's request to run tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRequest {
    pub subset: TestSubset,
    #[serde(default)]
    pub enable_code_coverage: bool,
}

/// Outcome of a single test. There is no partial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Succeeded,
    Failed,
}

/// One executed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    /// Wall-clock duration with sub-second precision.
    pub duration_seconds: f64,
}

/// Results for one test case, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub name: String,
    pub outcomes: Vec<TestOutcome>,
}

/// Results for one test target, in insertion order (never re-sorted).
///
/// Entries merge only with the immediately preceding entry of the same
/// name; a non-contiguous recurrence of a target name yields a second,
/// distinct entry. This grouping-by-adjacency is intentional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestTargetResult {
    pub name: String,
    pub cases: Vec<TestCaseResult>,
}

/// Result of a test request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// True iff zero outcomes failed.
    pub succeeded: bool,
    pub targets: Vec<TestTargetResult>,
    /// Path to the exported coverage JSON, when coverage was requested and
    /// at least one raw coverage file was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_json_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_round_trips() {
        let subsets = vec![
            TestSubset::All,
            TestSubset::Filtered { patterns: vec![] },
            TestSubset::Filtered {
                patterns: vec!["FooTests/".to_string()],
            },
        ];
        for subset in subsets {
            let json = serde_json::to_string(&subset).unwrap();
            let back: TestSubset = serde_json::from_str(&json).unwrap();
            assert_eq!(subset, back);
        }
    }

    #[test]
    fn coverage_path_omitted_when_absent() {
        let result = TestResult {
            succeeded: true,
            targets: vec![],
            coverage_json_path: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("coverage_json_path"));
    }
}
