use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeoClientError>;

#[derive(Debug, Error)]
pub enum GeoClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeoClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeoClientError::Timeout(err.to_string())
        } else if err.is_decode() {
            GeoClientError::Parse(err.to_string())
        } else {
            GeoClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GeoClientError {
    fn from(err: serde_json::Error) -> Self {
        GeoClientError::Parse(err.to_string())
    }
}
