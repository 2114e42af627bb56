use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while talking to the track source or the streaming service
#[derive(Error, Debug)]
pub enum SyncError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Machine-readable reason, when the API provides one
        reason: Option<String>,
        /// Error message from the API
        message: String,
    },

    /// The target playback device is gone or no longer active
    #[error("Device lost: {message}")]
    DeviceLost {
        /// Error message from the API
        message: String,
    },

    /// Invalid or unexpected response from a remote endpoint
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing or unusable credentials
    #[error("Credentials error: {0}")]
    Credentials(String),
}

impl SyncError {
    /// Whether this error means the selected output device must be re-acquired
    pub fn is_device_lost(&self) -> bool {
        matches!(self, SyncError::DeviceLost { .. })
    }
}

/// Why a playback dispatch did not succeed
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The start command failed for a reason other than a lost device
    #[error("Playback command failed: {0}")]
    Command(#[source] SyncError),

    /// The device was lost and no replacement became active
    #[error("Device lost and no replacement device became active")]
    NoReplacementDevice,

    /// The single retry on the replacement device failed too
    #[error("Retry on replacement device failed: {0}")]
    RetryFailed(#[source] SyncError),
}
