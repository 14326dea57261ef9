//! Error types for the orchestrator abstraction layer.

/// Errors that can occur during orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The named service does not exist in the cluster.
    #[error("Service not found: {name}")]
    NotFound {
        /// Name of the service that was not found.
        name: String,
    },

    /// The orchestrator rejected the requested operation.
    #[error("Orchestrator rejected request: {message}")]
    Rejected {
        /// Description of why the request was rejected.
        message: String,
    },

    /// Failed to reach the orchestrator endpoint.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// An internal backend error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl OrchestratorError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a new `Rejected` error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error means the service does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
