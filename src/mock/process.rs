//! Process runner double with a programmable responder.

use std::io;
use std::sync::{Arc, Mutex};

use crate::process::{ProcessInvocation, ProcessOutcome, ProcessRunner};

type Responder = dyn Fn(&ProcessInvocation) -> io::Result<ProcessOutcome> + Send + Sync;

/// Records every invocation in order and answers each through the
/// configured responder. The default responder reports a clean exit with
/// no output.
#[derive(Clone)]
pub struct MockProcessRunner {
    invocations: Arc<Mutex<Vec<ProcessInvocation>>>,
    responder: Arc<Responder>,
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new(|_| Ok(ProcessOutcome::succeeded(Vec::new())))
    }
}

impl MockProcessRunner {
    pub fn new(
        responder: impl Fn(&ProcessInvocation) -> io::Result<ProcessOutcome> + Send + Sync + 'static,
    ) -> Self {
        Self {
            invocations: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        }
    }

    /// Every invocation observed so far, in order.
    pub fn invocations(&self) -> Vec<ProcessInvocation> {
        self.invocations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ProcessRunner for MockProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> io::Result<ProcessOutcome> {
        self.invocations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(invocation.clone());
        (self.responder)(invocation)
    }
}
