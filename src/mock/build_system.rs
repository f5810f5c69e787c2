//! Scripted build system double.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::host::{
    BuildOutput, BuildParameters, BuildSubsetSpec, BuildSystem, BuildSystemProvider, HostError,
    RequestedOutput,
};

/// One recorded `create` call.
#[derive(Debug, Clone)]
pub struct CreationRecord {
    pub parameters: BuildParameters,
    pub manifest_caching: bool,
}

/// One recorded `build` call.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub subset: BuildSubsetSpec,
    pub outputs: Vec<RequestedOutput>,
}

#[derive(Default)]
struct State {
    scripted: VecDeque<BuildOutput>,
    log_bytes: Vec<u8>,
    creations: Vec<CreationRecord>,
    builds: Vec<BuildRecord>,
}

/// Build-system provider double.
///
/// Scripted outputs are consumed in order, one per `build` call; when the
/// script runs dry, builds succeed with an empty output. The configured
/// log bytes are written to the request's output stream on every build.
#[derive(Clone, Default)]
pub struct MockBuildSystemProvider {
    state: Arc<Mutex<State>>,
}

impl MockBuildSystemProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output for the next build call.
    pub fn push_output(&self, output: BuildOutput) {
        self.lock().scripted.push_back(output);
    }

    /// Bytes every build writes to its request's output stream.
    pub fn set_log_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.lock().log_bytes = bytes.into();
    }

    /// Every `create` call observed so far, in order.
    pub fn creations(&self) -> Vec<CreationRecord> {
        self.lock().creations.clone()
    }

    /// Every `build` call observed so far, in order.
    pub fn builds(&self) -> Vec<BuildRecord> {
        self.lock().builds.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BuildSystemProvider for MockBuildSystemProvider {
    fn create(
        &self,
        parameters: BuildParameters,
        manifest_caching: bool,
        output: Box<dyn Write + Send>,
    ) -> Result<Box<dyn BuildSystem>, HostError> {
        self.lock().creations.push(CreationRecord {
            parameters,
            manifest_caching,
        });
        Ok(Box::new(MockBuildSystem {
            state: Arc::clone(&self.state),
            output,
        }))
    }
}

struct MockBuildSystem {
    state: Arc<Mutex<State>>,
    output: Box<dyn Write + Send>,
}

impl BuildSystem for MockBuildSystem {
    fn build(
        &mut self,
        subset: &BuildSubsetSpec,
        outputs: &[RequestedOutput],
    ) -> Result<BuildOutput, HostError> {
        let (log_bytes, result) = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.builds.push(BuildRecord {
                subset: subset.clone(),
                outputs: outputs.to_vec(),
            });
            let result = state
                .scripted
                .pop_front()
                .unwrap_or_else(BuildOutput::successful);
            (state.log_bytes.clone(), result)
        };
        if !log_bytes.is_empty() {
            self.output
                .write_all(&log_bytes)
                .and_then(|()| self.output.flush())
                .map_err(|error| HostError::Internal(error.to_string()))?;
        }
        Ok(result)
    }
}
