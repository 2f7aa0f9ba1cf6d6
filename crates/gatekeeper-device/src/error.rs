//! Error types for controller API calls.
//!
//! These cover transport-level failures only. A controller that answers but
//! refuses a write is not an error: the call returns `Ok(false)`.

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors that can occur while talking to a controller.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Controller did not answer at all.
    #[error("Device unreachable: {device}")]
    Unreachable { device: String },

    /// Controller took longer than the caller allowed.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Request or reply was garbled in transit.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Controller answered with something that could not be decoded.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Anything else, as reported by the transport.
    #[error("{0}")]
    Other(String),
}

impl DeviceError {
    /// Unreachable controller, by serial number.
    pub fn unreachable(device: impl Into<String>) -> Self {
        Self::Unreachable {
            device: device.into(),
        }
    }

    /// Timed-out call, with the elapsed time in milliseconds.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
