//! Diagnostic log sink
//!
//! Only the property-chain repair path reports through this seam. Production
//! code forwards to `tracing`; [`BufferedLog`] keeps entries for inspection.

use parking_lot::Mutex;

/// Sink for operator-facing diagnostics
pub trait DiagnosticLog: Send + Sync {
    /// Record a warning with key/value context
    fn warn(&self, message: &str, fields: &[(&str, String)]);
}

/// Forwards diagnostics to `tracing::warn!`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl DiagnosticLog for TracingLog {
    fn warn(&self, message: &str, fields: &[(&str, String)]) {
        let context = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::warn!(target: "linkstore::diagnostics", context = %context, "{}", message);
    }
}

/// One captured diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Message text
    pub message: String,
    /// Key/value context
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Value of the context field `key`
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps diagnostics in memory
#[derive(Debug, Default)]
pub struct BufferedLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferedLog {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Whether any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|entry| entry.message.contains(needle))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing was logged
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticLog for BufferedLog {
    fn warn(&self, message: &str, fields: &[(&str, String)]) {
        self.entries.lock().push(LogEntry {
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}
