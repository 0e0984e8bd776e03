//! Error types for application unit operations.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during unit lifecycle and capability operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The framework handle passed to `initialize` was missing or dead.
    #[error("instance {0}: framework reference is invalid")]
    InvalidFrameworkReference(i32),

    /// A lifecycle operation was attempted before successful initialization.
    #[error("unit is not initialized")]
    NotInitialized,

    /// Stop was attempted on a unit that is not started.
    #[error("instance {id}: failed to stop, {name} is not started")]
    NotStarted {
        /// Instance id of the unit.
        id: i32,
        /// Unit name.
        name: String,
    },

    /// A capability acquisition was attempted with no framework reference.
    #[error("framework unavailable: {0}")]
    FrameworkUnavailable(String),

    /// No capability factory is registered under the requested type name.
    #[error("capability not found: {0}")]
    CapabilityNotFound(String),

    /// The framework resolved the capability kind but the plugin failed.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// An OS command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a not-started error for the given unit.
    pub fn not_started(id: i32, name: impl Into<String>) -> Self {
        Self::NotStarted {
            id,
            name: name.into(),
        }
    }

    /// Create a framework-unavailable error.
    pub fn framework_unavailable(msg: impl Into<String>) -> Self {
        Self::FrameworkUnavailable(msg.into())
    }

    /// Create a capability-not-found error.
    pub fn capability_not_found(kind: impl Into<String>) -> Self {
        Self::CapabilityNotFound(kind.into())
    }

    /// Create a capability-unavailable error.
    pub fn capability_unavailable(msg: impl Into<String>) -> Self {
        Self::CapabilityUnavailable(msg.into())
    }

    /// Create an execution-failed error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Returns true if the caller can recover by retrying after a corrective
    /// step (initializing first, starting first, or treating the capability
    /// as absent).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidFrameworkReference(_))
    }
}
