//! Plugin invocation dispatch.
//!
//! [`InvocationDelegate`] is the entry point of the bridge: it receives the
//! three plugin request kinds (build, test, symbol graph), dispatches each
//! as an independent unit of work on its own worker thread, and resolves a
//! single-fire completion callback with the result. The caller is never
//! blocked and may issue further requests immediately; failure or delay in
//! one outstanding request does not affect another.

pub mod build;
pub mod symbolgraph;
pub mod test_run;

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;

use thiserror::Error;
use tracing::debug;

use keel_plugin_protocol::{
    BuildRequest, BuildResult, SymbolGraphRequest, SymbolGraphResult, TestRequest, TestResult,
};

use crate::host::{
    BuildParameters, BuildSystemProvider, Diagnostic, HostError, ObservabilitySink, PackageGraph,
    Toolchain,
};
use crate::output::{LineBufferer, OutputTee, SharedBuffer, SharedStream};
use crate::process::ProcessRunner;

/// Tracing target for invocation dispatch.
const INVOCATION_TARGET: &str = "keel_plugin_host::invocation";

/// Everything a request needs from the host, bundled for dispatch.
///
/// Cloning is cheap: collaborators are shared handles, and each request
/// still constructs its own build-system instance and test environment, so
/// no configuration state is shared or mutated across concurrent requests.
#[derive(Clone)]
pub struct HostContext {
    /// The host's current product-build parameters.
    pub build_parameters: BuildParameters,
    pub build_system: Arc<dyn BuildSystemProvider>,
    pub package_graph: Arc<dyn PackageGraph>,
    pub toolchain: Arc<dyn Toolchain>,
    pub process_runner: Arc<dyn ProcessRunner>,
    pub sink: Arc<dyn ObservabilitySink>,
    /// User-visible stream that requests with `echo_logs` mirror into.
    pub echo_stream: Option<SharedStream>,
}

/// Hard failures of a plugin request.
///
/// Expected build/test failures are not errors; they come back inside the
/// result payload with `succeeded = false`. Nothing in this layer retries,
/// and partial progress is discarded on failure.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Configuration or capability problem reported by a collaborator.
    #[error(transparent)]
    Host(#[from] HostError),

    /// No build description exists for the requested module.
    #[error("no build description found for module '{0}'")]
    ModuleNotFound(String),

    /// An external tool exited non-zero; carries the process result.
    #[error("{tool} exited with status {exit_code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Filesystem or process-spawn I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A test filter pattern did not compile.
    #[error("invalid test filter pattern '{pattern}': {message}")]
    InvalidTestFilter { pattern: String, message: String },

    /// A test binary's enumeration output could not be obtained or parsed.
    #[error("test enumeration failed for '{binary}': {message}")]
    TestEnumeration { binary: String, message: String },

    /// The request's worker thread could not be spawned.
    #[error("failed to spawn request worker: {0}")]
    Spawn(String),
}

/// Per-request dispatch context handed to the coordinators.
pub(crate) struct RequestContext {
    pub plugin: String,
    pub request_id: String,
    pub host: HostContext,
}

impl RequestContext {
    /// Line-oriented forwarder into the observability sink, tagged with
    /// this request's plugin name.
    fn progress_line_sink(&self) -> LineBufferer {
        let sink = Arc::clone(&self.host.sink);
        let plugin = self.plugin.clone();
        LineBufferer::new(move |line| sink.progress(&plugin, line))
    }

    /// Output tee for a build request: capture buffer and line forwarder
    /// always, the user-visible echo stream only when requested.
    pub fn build_output(&self, echo: bool) -> (OutputTee, SharedBuffer) {
        let capture = SharedBuffer::new();
        let mut tee = OutputTee::new();
        tee.add_stream(Box::new(capture.clone()));
        tee.add_stream(Box::new(self.progress_line_sink()));
        if echo {
            if let Some(stream) = &self.host.echo_stream {
                tee.add_stream(Box::new(stream.clone()));
            }
        }
        (tee, capture)
    }

    /// Output tee for requests that do not capture a log payload.
    pub fn progress_output(&self) -> OutputTee {
        let mut tee = OutputTee::new();
        tee.add_stream(Box::new(self.progress_line_sink()));
        tee
    }

    /// Forward captured process output to the sink, line by line. A
    /// trailing partial line is dropped rather than emitted incomplete.
    pub fn forward_process_output(&self, bytes: &[u8]) {
        let mut lines = self.progress_line_sink();
        let _ = lines.write_all(bytes);
    }
}

/// Generate a request id (lowercase ULID).
fn generate_request_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// The plugin-facing entry point of the bridge.
///
/// One delegate serves one plugin; concurrent requests from the same or
/// different plugins (separate delegates over a shared [`HostContext`])
/// may be outstanding at once.
pub struct InvocationDelegate {
    plugin_name: String,
    context: HostContext,
}

impl InvocationDelegate {
    pub fn new(plugin_name: impl Into<String>, context: HostContext) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            context,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Run a build on behalf of the plugin.
    ///
    /// Returns immediately; `completion` fires exactly once on the worker
    /// thread with either the result or a hard failure.
    pub fn build<F>(&self, request: BuildRequest, completion: F)
    where
        F: FnOnce(Result<BuildResult, InvocationError>) + Send + 'static,
    {
        self.dispatch("build", completion, move |context: &RequestContext| {
            build::BuildRequestTranslator::new(context).run(&request)
        });
    }

    /// Run tests on behalf of the plugin.
    pub fn test<F>(&self, request: TestRequest, completion: F)
    where
        F: FnOnce(Result<TestResult, InvocationError>) + Send + 'static,
    {
        self.dispatch("test", completion, move |context: &RequestContext| {
            test_run::TestRunCoordinator::new(context).run(&request)
        });
    }

    /// Extract a symbol graph on behalf of the plugin.
    pub fn extract_symbol_graph<F>(&self, request: SymbolGraphRequest, completion: F)
    where
        F: FnOnce(Result<SymbolGraphResult, InvocationError>) + Send + 'static,
    {
        self.dispatch("symbol-graph", completion, move |context: &RequestContext| {
            symbolgraph::SymbolGraphExtractionCoordinator::new(context).run(&request)
        });
    }

    /// Forward a structured diagnostic to the sink, synchronously.
    pub fn emit_diagnostic(&self, diagnostic: Diagnostic) {
        self.context.sink.emit(&self.plugin_name, diagnostic);
    }

    /// Spawn one request as an owned unit of work on a named worker
    /// thread. The completion callback is held behind a single-take slot
    /// so it resolves exactly once whether the thread runs or the spawn
    /// itself fails.
    fn dispatch<T, F, W>(&self, kind: &str, completion: F, work: W)
    where
        T: Send + 'static,
        F: FnOnce(Result<T, InvocationError>) + Send + 'static,
        W: FnOnce(&RequestContext) -> Result<T, InvocationError> + Send + 'static,
    {
        let context = RequestContext {
            plugin: self.plugin_name.clone(),
            request_id: generate_request_id(),
            host: self.context.clone(),
        };
        debug!(
            target: INVOCATION_TARGET,
            plugin = %context.plugin,
            request_id = %context.request_id,
            kind,
            "dispatching plugin request"
        );

        let completion = Arc::new(Mutex::new(Some(completion)));
        let completion_in_thread = Arc::clone(&completion);
        let thread_name = format!("keel-plugin-{}-{}", kind, context.request_id);
        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            let outcome = work(&context);
            if let Some(complete) = take_completion(&completion_in_thread) {
                complete(outcome);
            }
        });

        if let Err(error) = spawned {
            if let Some(complete) = take_completion(&completion) {
                complete(Err(InvocationError::Spawn(error.to_string())));
            }
        }
    }
}

fn take_completion<F>(slot: &Arc<Mutex<Option<F>>>) -> Option<F> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}
