use thiserror::Error;

use crate::types::Coordinate;

/// Input rejected before any external call is made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("fault label is empty")]
    EmptyFaultLabel,
}

/// Failure of a single geocoding source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("{source_id}: request failed: {message}")]
    Request { source_id: String, message: String },

    #[error("{source_id}: timed out after {timeout_ms}ms")]
    Timeout { source_id: String, timeout_ms: u64 },

    #[error("{source_id}: no address information for this point")]
    NoAddress { source_id: String },
}

impl GeoError {
    pub fn source_id(&self) -> &str {
        match self {
            GeoError::Request { source_id, .. }
            | GeoError::Timeout { source_id, .. }
            | GeoError::NoAddress { source_id } => source_id,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// The mandatory base lookup failed. Retryable by the caller.
    #[error("geocoding unavailable for {coordinate}: {cause}")]
    GeocodingUnavailable { coordinate: Coordinate, cause: GeoError },
}
