//! Observability sink double.

use std::sync::{Arc, Mutex};

use crate::host::{Diagnostic, ObservabilitySink};

/// Collects every diagnostic and progress line, tagged with the plugin
/// that produced it.
#[derive(Clone, Default)]
pub struct RecordingSink {
    diagnostics: Arc<Mutex<Vec<(String, Diagnostic)>>>,
    lines: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<(String, Diagnostic)> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Recorded `(plugin, line)` pairs in arrival order.
    pub fn progress_lines(&self) -> Vec<(String, String)> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ObservabilitySink for RecordingSink {
    fn emit(&self, plugin: &str, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((plugin.to_string(), diagnostic));
    }

    fn progress(&self, plugin: &str, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((plugin.to_string(), line.to_string()));
    }
}
