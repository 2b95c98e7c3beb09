//! Error types for the heater client.

use thiserror::Error;

use crate::fields::Endpoint;

/// Result type for heater operations.
pub type HeaterResult<T> = Result<T, HeaterError>;

/// Error type for heater operations.
#[derive(Debug, Error)]
pub enum HeaterError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Could not reach the device
    #[error("Connection error: {0}")]
    Connection(String),

    /// Device answered but the exchange failed
    #[error("Communication error: {0}")]
    Communication(String),

    /// Request exceeded the transport timeout
    #[error("Request to /{0} timed out")]
    Timeout(String),

    /// Field table references a position the response does not have
    #[error("Field position {position} out of range for /{endpoint} response with {len} values")]
    OutOfRange {
        endpoint: Endpoint,
        position: usize,
        len: usize,
    },

    /// A field required by the caller is not in the device state
    #[error("Field '{0}' not present in device state")]
    MissingField(String),

    /// Raw temperature code or value not in the temperature table
    #[error("Temperature '{0}' not in temperature table")]
    UnknownTemperature(String),

    /// Operation not supported by the entity
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Initial fetch failed, setup should be retried later
    #[error("Device not ready: {0}")]
    NotReady(String),

    /// An observer callback failed during notification
    #[error("Observer failed: {0}")]
    Observer(anyhow::Error),

    /// Other error
    #[error("Heater error: {0}")]
    Other(#[from] anyhow::Error),
}

impl HeaterError {
    /// Whether this error came from the transport (and therefore cleared the state).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Communication(_) | Self::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for HeaterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            let path = e
                .url()
                .map(|u| u.path().trim_start_matches('/').to_string())
                .unwrap_or_default();
            Self::Timeout(path)
        } else if e.is_connect() {
            Self::Connection(format!("HTTP request failed: {}", e))
        } else {
            Self::Communication(format!("HTTP request failed: {}", e))
        }
    }
}
