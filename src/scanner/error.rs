//! Scanner Error Types

/// Scan-level failures
///
/// Per-port network errors never show up here: they are folded into a
/// closed probe outcome inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Target, port set or scan options were rejected before dispatch
    #[error("Invalid scan input: {0}")]
    InvalidInput(String),

    /// The scan was torn down before every probe completed
    #[error("Scan of {target} cancelled after {completed} of {total} probes")]
    Cancelled {
        target: String,
        completed: usize,
        total: usize,
    },
}
