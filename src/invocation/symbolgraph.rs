//! Symbol graph extraction on behalf of plugins.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use keel_plugin_protocol::{SymbolGraphRequest, SymbolGraphResult};

use crate::host::{
    BuildDestination, BuildParameters, BuildPlan, BuildSubsetSpec, HostError,
    ModuleBuildDescription, RequestedOutput,
};
use crate::invocation::{InvocationError, RequestContext};
use crate::process::ProcessInvocation;

const SYMBOLGRAPH_TARGET: &str = "keel_plugin_host::invocation::symbolgraph";

/// Resolves a target's build description and either reuses a natively
/// produced symbol graph or invokes the external extractor.
pub(crate) struct SymbolGraphExtractionCoordinator<'a> {
    context: &'a RequestContext,
}

impl<'a> SymbolGraphExtractionCoordinator<'a> {
    pub(crate) fn new(context: &'a RequestContext) -> Self {
        Self { context }
    }

    pub(crate) fn run(
        self,
        request: &SymbolGraphRequest,
    ) -> Result<SymbolGraphResult, InvocationError> {
        let parameters = self.context.host.build_parameters.clone();

        let tee = self.context.progress_output();
        let mut build_system =
            self.context
                .host
                .build_system
                .create(parameters.clone(), false, Box::new(tee))?;

        // Build just enough to obtain a native graph or a build plan.
        let output = build_system.build(
            &BuildSubsetSpec::Target(request.target_name.clone()),
            &[RequestedOutput::SymbolGraph, RequestedOutput::BuildPlan],
        )?;

        if let Some(directory) = output.symbol_graph_directory {
            debug!(
                target: SYMBOLGRAPH_TARGET,
                request_id = %self.context.request_id,
                directory = %directory.display(),
                "reusing natively produced symbol graph"
            );
            return Ok(SymbolGraphResult { directory });
        }

        let plan = output.build_plan.ok_or_else(|| {
            HostError::UnsupportedOutput(
                "symbol graph extraction requires a build plan".to_string(),
            )
        })?;
        let description = select_description(&plan, &request.target_name)
            .ok_or_else(|| InvocationError::ModuleNotFound(request.target_name.clone()))?;

        let output_dir = extraction_output_dir(&parameters, description, &request.target_name);
        // Idempotent reset of the deterministic output location.
        if output_dir.exists() {
            fs::remove_dir_all(&output_dir)?;
        }
        fs::create_dir_all(&output_dir)?;

        let extractor = self.context.host.toolchain.symbol_graph_extractor()?;
        let mut invocation = ProcessInvocation::new(extractor)
            .args(["-module-name", &description.module_name])
            .args([
                "-minimum-access-level",
                request.options.minimum_access_level.as_str(),
            ])
            .arg("-skip-inherited-docs");
        if !request.options.include_synthesized {
            invocation = invocation.arg("-skip-synthesized-members");
        }
        if request.options.include_spi {
            invocation = invocation.arg("-include-spi-symbols");
        }
        if request.options.emit_extension_blocks {
            invocation = invocation.arg("-emit-extension-block-symbols");
        }
        invocation = invocation
            .args(description.extractor_arguments.iter().cloned())
            .arg("-output-dir")
            .arg(output_dir.display().to_string());

        let outcome = self.context.host.process_runner.run(&invocation)?;
        self.context.forward_process_output(&outcome.stdout);
        if !outcome.success() {
            return Err(InvocationError::ToolFailed {
                tool: invocation.tool_name(),
                exit_code: outcome.exit_code,
                stderr: outcome.stderr_text(),
            });
        }

        Ok(SymbolGraphResult {
            directory: output_dir,
        })
    }
}

/// Find the module's build description by exact name.
///
/// When descriptions exist for both the target and host destinations, the
/// target one wins. The preference is a policy carried over from the host
/// product and is kept as-is pending product input.
fn select_description<'p>(
    plan: &'p BuildPlan,
    module_name: &str,
) -> Option<&'p ModuleBuildDescription> {
    let candidates: Vec<&ModuleBuildDescription> = plan
        .descriptions
        .iter()
        .filter(|description| description.module_name == module_name)
        .collect();
    candidates
        .iter()
        .find(|description| description.destination == BuildDestination::Target)
        .or_else(|| candidates.first())
        .copied()
}

/// Deterministic extraction output directory:
/// `<build-path>/extracted-symbols/<package-identity>/<target-name>`.
fn extraction_output_dir(
    parameters: &BuildParameters,
    description: &ModuleBuildDescription,
    target_name: &str,
) -> PathBuf {
    parameters
        .build_path
        .join("extracted-symbols")
        .join(&description.package_identity)
        .join(target_name)
}
