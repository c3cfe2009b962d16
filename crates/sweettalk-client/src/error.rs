//! Client error types.

use thiserror::Error;

/// Result type for SweetTalk client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur talking to the SweetTalk backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before or during transfer.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{endpoint} failed: {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    /// The response body could not be parsed.
    #[error("failed to parse response: {0}")]
    Decode(String),

    /// Attachment limit for one chat turn exceeded.
    #[error("at most {max} images per message")]
    TooManyImages { max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_includes_status_text() {
        let err = ClientError::Status {
            endpoint: "fetch phrases",
            status: reqwest::StatusCode::NOT_FOUND,
        };
        let msg = err.to_string();
        assert!(msg.contains("fetch phrases"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_too_many_images_message() {
        let err = ClientError::TooManyImages { max: 3 };
        assert_eq!(err.to_string(), "at most 3 images per message");
    }
}
