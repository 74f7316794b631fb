use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("HTTP request to {0} failed: {1}")]
    Http(String, String),
    #[error("{0} answered with HTTP status {1}")]
    HttpStatus(String, u16),
    #[error("Failed to read response body from {0}: {1}")]
    Body(String, String),
    #[error("Invalid JSON payload: {0}")]
    Json(String),
    #[error("Player state payload is not a JSON object")]
    NotAMapping,
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
}

impl ControlError {
    pub fn http(url: &str, err: impl std::fmt::Display) -> Self {
        ControlError::Http(url.to_string(), err.to_string())
    }

    pub fn body(url: &str, err: impl std::fmt::Display) -> Self {
        ControlError::Body(url.to_string(), err.to_string())
    }
}
