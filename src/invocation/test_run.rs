//! Test execution on behalf of plugins.
//!
//! The coordinator always builds the full test subset (tests cannot be
//! selectively compiled before their binaries exist), enumerates and
//! filters individual tests, runs the selected ones strictly sequentially
//! for accurate per-test wall-clock timing, and aggregates the outcomes
//! into per-target results. With coverage enabled it also merges the raw
//! coverage output and exports it to JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use regex_lite::Regex;
use serde::Deserialize;
use tracing::debug;

use keel_plugin_protocol::{
    TestCaseResult, TestOutcome, TestRequest, TestResult, TestStatus, TestSubset, TestTargetResult,
};

use crate::host::{
    coverage_profile_pattern, BuildSubsetSpec, Environment, TestProduct,
};
use crate::invocation::{InvocationError, RequestContext};
use crate::process::{base_environment, ProcessInvocation};

const TEST_TARGET: &str = "keel_plugin_host::invocation::test_run";

/// Enumeration payload emitted by a test binary for
/// `--enumerate-tests --format=json`.
#[derive(Debug, Deserialize)]
struct EnumeratedTests {
    suites: Vec<EnumeratedSuite>,
}

#[derive(Debug, Deserialize)]
struct EnumeratedSuite {
    #[allow(dead_code)]
    name: String,
    cases: Vec<EnumeratedCase>,
}

#[derive(Debug, Deserialize)]
struct EnumeratedCase {
    name: String,
    tests: Vec<String>,
}

/// Compiled include filter. `None` selects every test.
struct TestFilter(Option<Vec<Regex>>);

impl TestFilter {
    fn compile(subset: &TestSubset) -> Result<Self, InvocationError> {
        match subset {
            TestSubset::All => Ok(Self(None)),
            TestSubset::Filtered { patterns } => {
                let compiled = patterns
                    .iter()
                    .map(|pattern| {
                        Regex::new(pattern).map_err(|error| InvocationError::InvalidTestFilter {
                            pattern: pattern.clone(),
                            message: error.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self(Some(compiled)))
            }
        }
    }

    /// A test is selected iff `"<case>/<test>"` matches at least one
    /// pattern (regex search, not full match). An empty pattern set
    /// selects nothing.
    fn selects(&self, case: &str, test: &str) -> bool {
        match &self.0 {
            None => true,
            Some(patterns) => {
                let identifier = format!("{}/{}", case, test);
                patterns.iter().any(|pattern| pattern.is_match(&identifier))
            }
        }
    }
}

/// Builds test binaries, runs the selected tests, and aggregates results.
pub(crate) struct TestRunCoordinator<'a> {
    context: &'a RequestContext,
}

impl<'a> TestRunCoordinator<'a> {
    pub(crate) fn new(context: &'a RequestContext) -> Self {
        Self { context }
    }

    pub(crate) fn run(self, request: &TestRequest) -> Result<TestResult, InvocationError> {
        // Compile the filter up front so a bad pattern fails before any
        // build work happens.
        let filter = TestFilter::compile(&request.subset)?;

        let mut parameters = self.context.host.build_parameters.clone();
        parameters.explicit_testability = true;
        parameters.enable_code_coverage = request.enable_code_coverage;

        let coverage_dir = parameters.coverage_directory();
        if request.enable_code_coverage {
            // Idempotent pre-run reset of the shared coverage directory.
            if coverage_dir.exists() {
                fs::remove_dir_all(&coverage_dir)?;
            }
            fs::create_dir_all(&coverage_dir)?;
        }

        let tee = self.context.progress_output();
        let mut build_system =
            self.context
                .host
                .build_system
                .create(parameters.clone(), false, Box::new(tee))?;

        debug!(
            target: TEST_TARGET,
            request_id = %self.context.request_id,
            coverage = request.enable_code_coverage,
            "building test products"
        );

        let output = build_system.build(&BuildSubsetSpec::AllIncludingTests, &[])?;
        if !output.succeeded {
            // Expected failure: report it in the payload, not as an error.
            return Ok(TestResult {
                succeeded: false,
                targets: Vec::new(),
                coverage_json_path: None,
            });
        }

        // One execution environment per request, reused for every run.
        let environment = test_environment(request.enable_code_coverage.then_some(&coverage_dir));

        let mut targets: Vec<TestTargetResult> = Vec::new();
        let mut failed = 0usize;

        for product in &output.test_products {
            for suite in self.enumerate(product, &environment)? {
                for case in suite.cases {
                    let selected: Vec<&String> = case
                        .tests
                        .iter()
                        .filter(|test| filter.selects(&case.name, test))
                        .collect();
                    // A case contributing zero selected tests produces no
                    // entry at all.
                    if selected.is_empty() {
                        continue;
                    }

                    let mut outcomes = Vec::with_capacity(selected.len());
                    for test in selected {
                        let started = Instant::now();
                        let passed = self.run_single(product, &case.name, test, &environment)?;
                        let duration_seconds = started.elapsed().as_secs_f64();
                        if !passed {
                            failed += 1;
                        }
                        outcomes.push(TestOutcome {
                            name: test.clone(),
                            status: if passed {
                                TestStatus::Succeeded
                            } else {
                                TestStatus::Failed
                            },
                            duration_seconds,
                        });
                    }

                    append_case(&mut targets, &case.name, outcomes);
                }
            }
        }

        let coverage_json_path = if request.enable_code_coverage {
            self.merge_and_export_coverage(&coverage_dir, &output.test_products)?
        } else {
            None
        };

        Ok(TestResult {
            succeeded: failed == 0,
            targets,
            coverage_json_path,
        })
    }

    /// Enumerate a test product's suites, cases, and tests.
    fn enumerate(
        &self,
        product: &TestProduct,
        environment: &Environment,
    ) -> Result<Vec<EnumeratedSuite>, InvocationError> {
        let invocation = ProcessInvocation::new(&product.binary_path)
            .args(["--enumerate-tests", "--format=json"])
            .environment(environment.clone());
        let outcome = self.context.host.process_runner.run(&invocation)?;
        if !outcome.success() {
            return Err(InvocationError::TestEnumeration {
                binary: product.binary_path.display().to_string(),
                message: outcome.stderr_text(),
            });
        }
        let parsed: EnumeratedTests = serde_json::from_slice(&outcome.stdout).map_err(|error| {
            InvocationError::TestEnumeration {
                binary: product.binary_path.display().to_string(),
                message: error.to_string(),
            }
        })?;
        Ok(parsed.suites)
    }

    /// Run one test and report whether it passed. Tests run strictly
    /// sequentially so wall-clock durations stay accurate.
    fn run_single(
        &self,
        product: &TestProduct,
        case: &str,
        test: &str,
        environment: &Environment,
    ) -> Result<bool, InvocationError> {
        let invocation = ProcessInvocation::new(&product.binary_path)
            .arg("--filter")
            .arg(format!("{}/{}", case, test))
            .environment(environment.clone());
        let outcome = self.context.host.process_runner.run(&invocation)?;
        self.context.forward_process_output(&outcome.stdout);
        Ok(outcome.success())
    }

    /// Merge every raw coverage file currently present in the coverage
    /// directory and export the merged data to JSON.
    ///
    /// The merge deliberately draws from the whole shared directory, not
    /// only files produced by the filtered test set.
    fn merge_and_export_coverage(
        &self,
        coverage_dir: &Path,
        test_products: &[TestProduct],
    ) -> Result<Option<PathBuf>, InvocationError> {
        let mut raw_files = Vec::new();
        for entry in fs::read_dir(coverage_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "profraw") {
                raw_files.push(path);
            }
        }
        if raw_files.is_empty() {
            return Ok(None);
        }
        raw_files.sort();

        let merged_path = coverage_dir.join("default.profdata");
        let merge_tool = self.context.host.toolchain.coverage_merge_tool()?;
        let merge = ProcessInvocation::new(merge_tool)
            .args(["merge", "-sparse"])
            .args(raw_files.iter().map(|path| path.display().to_string()))
            .arg("-o")
            .arg(merged_path.display().to_string());
        let outcome = self.context.host.process_runner.run(&merge)?;
        if !outcome.success() {
            return Err(InvocationError::ToolFailed {
                tool: merge.tool_name(),
                exit_code: outcome.exit_code,
                stderr: outcome.stderr_text(),
            });
        }

        let export_tool = self.context.host.toolchain.coverage_export_tool()?;
        let mut export = ProcessInvocation::new(export_tool)
            .arg("export")
            .arg("-instr-profile")
            .arg(merged_path.display().to_string());
        // Every built test binary participates as an input object,
        // regardless of which tests the filter selected.
        for product in test_products {
            export = export
                .arg("-object")
                .arg(product.binary_path.display().to_string());
        }
        let outcome = self.context.host.process_runner.run(&export)?;
        if !outcome.success() {
            return Err(InvocationError::ToolFailed {
                tool: export.tool_name(),
                exit_code: outcome.exit_code,
                stderr: outcome.stderr_text(),
            });
        }

        // The JSON lands beside the merged file under the same base name.
        let json_path = merged_path.with_extension("json");
        fs::write(&json_path, &outcome.stdout)?;

        debug!(
            target: TEST_TARGET,
            request_id = %self.context.request_id,
            raw_files = raw_files.len(),
            path = %json_path.display(),
            "exported merged coverage"
        );

        Ok(Some(json_path))
    }
}

/// Execution environment for test processes: the allowlisted host
/// environment, plus the coverage profile pattern when instrumenting.
fn test_environment(coverage_dir: Option<&PathBuf>) -> Environment {
    let mut environment = base_environment();
    if let Some(dir) = coverage_dir {
        environment.insert(
            "LLVM_PROFILE_FILE".to_string(),
            coverage_profile_pattern(dir),
        );
    }
    environment
}

/// Target a case belongs to: the case-name prefix up to the first `.`.
fn target_name_of(case: &str) -> &str {
    case.split('.').next().unwrap_or(case)
}

/// Append a case result, grouping by adjacency: merge into the last target
/// entry only when its name matches, otherwise start a new entry.
/// Non-contiguous recurrence of a target name yields a second, distinct
/// entry; this is intentional grouping-by-adjacency, not
/// grouping-by-identity.
fn append_case(targets: &mut Vec<TestTargetResult>, case_name: &str, outcomes: Vec<TestOutcome>) {
    let target_name = target_name_of(case_name);
    let case = TestCaseResult {
        name: case_name.to_string(),
        outcomes,
    };
    match targets.last_mut() {
        Some(last) if last.name == target_name => last.cases.push(case),
        _ => targets.push(TestTargetResult {
            name: target_name.to_string(),
            cases: vec![case],
        }),
    }
}
