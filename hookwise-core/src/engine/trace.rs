//! Trace identifiers for hook evaluations
//!
//! Every [`HookContext`](super::context::HookContext) gets a UUID v7 trace id
//! so that all log lines of one evaluation can be correlated. v7 ids are
//! time-ordered, which keeps them sortable in log files.

use uuid::Uuid;

/// Generate a unique trace ID for one hook evaluation
pub fn generate_trace_id() -> String {
    Uuid::now_v7().to_string()
}
