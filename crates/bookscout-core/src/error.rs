use thiserror::Error;

/// Application-wide error types for bookscout.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad local parameters. Never sent over the network.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backend could not be reached (connection refused, reset, DNS).
    #[error("Network error: {0}")]
    TransportFailure(String),

    /// Request exceeded its client-side bound.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Well-formed error response from the backend.
    #[error("Backend rejected the request (HTTP {status_code}): {detail}")]
    BackendRejected { status_code: u16, detail: String },

    /// The liveness monitor reports the backend as offline.
    #[error("Backend is offline")]
    Offline,

    /// Another crawl or listing is already in flight.
    #[error("Another request is already in progress")]
    Busy,

    /// The user declined the confirmation gate.
    #[error("Request cancelled: confirmation declined")]
    Declined,

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Unclassified failure, carrying the raw error text.
    #[error("{0}")]
    Unknown(String),
}

impl AppError {
    /// Returns true for network-level failures that warrant a liveness re-check.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::TransportFailure(_))
    }

    /// Returns true for rejections decided locally, before any network traffic.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_)
                | AppError::Offline
                | AppError::Busy
                | AppError::Declined
                | AppError::ConfigError(_)
        )
    }

    /// One-line message suitable for the host's notice area.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::TransportFailure(_) => {
                "Cannot connect to the backend, it may have exited".to_string()
            }
            AppError::Timeout(secs) => format!(
                "Request timed out after {secs}s, try a smaller limit or retry later"
            ),
            AppError::BackendRejected { detail, .. } => format!("Request failed: {detail}"),
            AppError::Offline => {
                "Backend is not running, start the backend service first".to_string()
            }
            AppError::Busy => "A request is already running, wait for it to finish".to_string(),
            AppError::Declined => "Cancelled".to_string(),
            other => format!("Request failed: {other}"),
        }
    }
}
