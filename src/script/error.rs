use std::path::PathBuf;
use thiserror::Error;

/// Failures reported to the immediate caller of an invocation.
///
/// Runtime faults raised by a script are not part of this type: the executor
/// turns them into an error-shaped response instead.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Either file or source is required in params")]
    Validation,

    #[error("Syntax error in {origin}{}: {message}", .line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
    Syntax {
        origin: String,
        message: String,
        line: Option<usize>,
    },

    #[error("Failed to read script {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Discovery failed: {0}")]
    Discovery(String),
}
