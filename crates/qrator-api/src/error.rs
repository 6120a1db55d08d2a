//! Error taxonomy for Qrator API calls.

use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures a single API call can produce.
///
/// `Api` is a logical failure: the transport succeeded and the envelope was
/// well-formed, but the service reported an error in its `error` field.
/// `Decode` means the envelope's opaque `result` did not match the shape the
/// caller expected.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to qrator api failed: {0}")]
    Transport(String),

    #[error("qrator api returned an error: {0}")]
    Api(String),

    #[error("failed to decode api result: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether this failure came from mapping the result payload into a
    /// typed shape (as opposed to transport or service-side failures).
    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode(_))
    }
}
