//! Administrative tool error types.

/// Diagnostic substring the tool emits when deleting an absent key.
const ABSENT_KEY_MARKER: &str = "delete failed: No such file or directory";

/// Errors from the external administrative transport.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool binary could not be launched at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The tool ran and reported failure.
    #[error("{context}: {program} {status}: {diagnostics}")]
    Failed {
        /// Operation context, e.g. the subcommand and map path.
        context: String,
        /// Program that was invoked.
        program: String,
        /// Exit status, rendered.
        status: String,
        /// Captured diagnostic output.
        diagnostics: String,
    },

    /// The tool produced output that could not be parsed as JSON.
    #[error("{context}: tool returned bad JSON: {source}")]
    BadJson {
        /// Operation context.
        context: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

impl ToolError {
    /// True when the diagnostics identify a keyed delete of an entry that
    /// did not exist, as opposed to a genuine invocation failure.
    #[must_use]
    pub fn indicates_absent_key(&self) -> bool {
        matches!(self, ToolError::Failed { diagnostics, .. } if diagnostics.contains(ABSENT_KEY_MARKER))
    }
}
