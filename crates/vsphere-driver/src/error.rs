//! Error types for vsphere-driver.

use thiserror::Error;

/// Result type alias for vsphere-driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Failure reported by a backend connection.
///
/// Carries the name of the primitive that failed so callers can tell
/// a failed power-on from a failed upload without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("vSphere {operation} failed: {message}")]
pub struct BackendError {
    /// Backend primitive that failed (e.g. `power on`)
    pub operation: String,
    /// Message reported by the backend
    pub message: String,
}

impl BackendError {
    /// Create a new backend error for the given operation.
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur during machine lifecycle operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A required configuration value is missing
    #[error("incomplete vSphere configuration: missing {0}")]
    IncompleteConfig(String),

    /// The machine is not in the state the operation requires
    #[error("machine {0} state invalid")]
    InvalidState(String),

    /// Backend connection error
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Failed to download the boot image
    #[error("failed to download {url}: {source}")]
    Download {
        /// Source URL
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// Image server answered with a non-success status
    #[error("failed to download {url}: server returned {status}")]
    HttpStatus {
        /// Source URL
        url: String,
        /// HTTP status returned by the server
        status: u16,
    },

    /// SSH key pair could not be generated
    #[error("failed to generate SSH key pair: {0}")]
    KeyGeneration(String),

    /// A command run inside the guest over SSH failed
    #[error("remote command failed: {0}")]
    RemoteCommand(String),

    /// Stopping a running machine before removal failed
    #[error("can't stop VM: {0}")]
    StopBeforeRemove(#[source] Box<DriverError>),

    /// No driver is registered under the requested name
    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    /// Operation is not supported by this driver
    #[error("{0}")]
    Unsupported(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Whether the error is raised before the machine exists on the backend.
    ///
    /// A create that fails this way leaves nothing to remove remotely and can
    /// be retried from scratch.
    pub fn precedes_provisioning(&self) -> bool {
        matches!(
            self,
            DriverError::IncompleteConfig(_)
                | DriverError::Download { .. }
                | DriverError::HttpStatus { .. }
                | DriverError::KeyGeneration(_)
        )
    }
}
