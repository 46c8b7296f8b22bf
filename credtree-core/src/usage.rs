//! Idempotent usage-record association for secret accesses.

use std::collections::HashSet;
use std::sync::Mutex;

/// Records which credential was used from which context.
///
/// Tracking is keyed by `(context, credential)` so repeated accesses of the
/// same secret from the same context collapse into one record: callers
/// invoke it once per logical access, and re-invocations are no-ops. The
/// record set doubles as the administrative diagnostic path that can tell
/// "never resolved" apart from "resolved but hidden".
#[derive(Debug, Default)]
pub struct UsageTracker {
    records: Mutex<HashSet<(String, String)>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a credential with a context; returns `true` when this call
    /// created a new record.
    pub fn track(&self, context_id: &str, credential_id: &str) -> bool {
        let mut records = self.records.lock().unwrap();
        records.insert((context_id.to_string(), credential_id.to_string()))
    }

    pub fn recorded(&self, context_id: &str, credential_id: &str) -> bool {
        let records = self.records.lock().unwrap();
        records.contains(&(context_id.to_string(), credential_id.to_string()))
    }

    /// Sorted snapshot for diagnostics.
    pub fn records(&self) -> Vec<(String, String)> {
        let records = self.records.lock().unwrap();
        let mut out: Vec<_> = records.iter().cloned().collect();
        out.sort();
        out
    }
}
