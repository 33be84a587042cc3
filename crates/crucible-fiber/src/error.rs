//! Error types for the reconciliation engine.

use crate::host::HostError;
use thiserror::Error;

/// Errors that can occur while scheduling, rendering or committing a tree.
#[derive(Error, Debug)]
pub enum Error {
    /// A host adapter primitive failed outside of a commit.
    #[error("Host adapter error: {0}")]
    Host(#[from] HostError),

    /// A render was requested while another one is mid-traversal.
    #[error("A render is already in progress ({units} units processed)")]
    RenderInFlight {
        /// Units already processed by the in-flight render.
        units: usize,
    },

    /// The engine is bound to a different host container.
    #[error("Render target does not match the committed container")]
    ContainerMismatch,

    /// A commit was abandoned. `applied` mutations reached the host tree
    /// before the failing one (zero when validation rejected the batch).
    #[error("Commit aborted at mutation {index} ({applied} applied): {source}")]
    CommitAborted {
        /// Position of the failing mutation in the commit plan.
        index: usize,
        /// Mutations already applied to the host tree.
        applied: usize,
        /// Underlying adapter failure.
        #[source]
        source: HostError,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while loading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert TOML parse errors to our error type.
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Convert TOML serialization errors to our error type.
impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
