//! Diagnostic reporter: formats and emits coherency warnings.
//!
//! Two message templates, emitted verbatim so downstream log scrapers can
//! match on them:
//!
//! ```text
//! WARNING: Accessing stale data on <Space> for Field <name>[<component>]=<value>
//! WARNING: Accessing un-updated Field <name> on <Space> after mesh modification
//! ```
//!
//! When location capture is enabled the line is suffixed with
//! ` (<file>:<line>)` of the access call. The reporter never throws and
//! never deduplicates; suppression is owned by the access passes.
//!
//! Value formatting mirrors the two spaces' native accessors: device-side
//! values print with six fixed decimals (`10.000000`), host-side values
//! with the scalar's natural `Display` form (`10`, `3.14`).

use core::panic::Location;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DebugConfig;
use crate::data::FieldScalar;
use crate::sync::MemorySpace;

/// Destination for diagnostic lines. Implementations must tolerate
/// concurrent emission from device-side passes.
pub trait DiagnosticSink: Send + Sync {
    /// Write one diagnostic line.
    fn emit(&self, line: &str);
}

/// Default sink: one line per diagnostic on standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn emit(&self, line: &str) {
        eprintln!("{line}");
    }
}

/// Sink that forwards diagnostics to the `log` facade at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, line: &str) {
        log::warn!(target: "mesh_mirror::diagnostics", "{line}");
    }
}

/// Sink that collects diagnostics in memory; clone freely, all clones share
/// the same buffer. Intended for tests.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    /// Snapshot of the collected lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Drain the collected lines.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    /// True iff nothing has been emitted since the last `take`.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl DiagnosticSink for CaptureSink {
    fn emit(&self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }
}

/// Formats violations and hands them to the configured sink.
pub struct DiagnosticReporter {
    sink: Box<dyn DiagnosticSink>,
    config: DebugConfig,
}

impl fmt::Debug for DiagnosticReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticReporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DiagnosticReporter {
    /// Build a reporter over `sink` with the given configuration.
    pub fn new(sink: Box<dyn DiagnosticSink>, config: DebugConfig) -> Self {
        Self { sink, config }
    }

    /// Emit the stale-data warning for one slot.
    pub fn stale_access(
        &self,
        space: MemorySpace,
        field: &str,
        component: usize,
        value: &str,
        location: &'static Location<'static>,
    ) {
        let mut line =
            format!("WARNING: Accessing stale data on {space} for Field {field}[{component}]={value}");
        self.annotate(&mut line, location);
        self.sink.emit(&line);
    }

    /// Emit the un-updated-after-mesh-modification warning.
    pub fn unrefreshed_access(
        &self,
        field: &str,
        space: MemorySpace,
        location: &'static Location<'static>,
    ) {
        let mut line =
            format!("WARNING: Accessing un-updated Field {field} on {space} after mesh modification");
        self.annotate(&mut line, location);
        self.sink.emit(&line);
    }

    fn annotate(&self, line: &mut String, location: &'static Location<'static>) {
        if self.config.capture_location {
            line.push_str(&format!(" ({}:{})", location.file(), location.line()));
        }
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new(Box::new(StderrSink), DebugConfig::default())
    }
}

/// Diagnostic text for a value observed on `space`.
pub(crate) fn value_text<V: FieldScalar>(space: MemorySpace, value: V) -> String {
    match space {
        MemorySpace::Device => format!("{:.6}", crate::data::to_f64(value)),
        MemorySpace::Host => format!("{value}"),
    }
}
