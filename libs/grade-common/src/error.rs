/// Error taxonomy shared by the grader
///
/// Two channels:
/// - `FatalError` stops the run before any repository is touched
/// - `Recoverable` is always caught at the test or repository boundary
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatalError {
    /// A test-suite record is malformed
    #[error("invalid test definition #{index} ({name}): {reason}")]
    InvalidDefinition {
        index: usize,
        name: String,
        reason: String,
    },

    /// A required setting is missing
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read {path}: {source}")]
    SuiteIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    SuiteParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure to run one command; scored as a non-match
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read captured output {path}: {source}")]
    Capture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum Recoverable {
    #[error("no remote URL for {0}")]
    NoRemote(String),

    #[error(transparent)]
    Execution(#[from] ExecutionFailure),

    #[error("repository failure: {0}")]
    Repository(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
