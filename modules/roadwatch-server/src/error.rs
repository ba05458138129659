use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use roadwatch_domains::faults::IngestError;

/// Error returned by every handler. Rendered as `{"error", "code"}`.
#[derive(Debug)]
pub enum ApiError {
    Ingest(IngestError),
    /// The body could not be parsed as a detection.
    BadRequest(String),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ApiError::Ingest(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ingest(err) => match err {
                IngestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                IngestError::UpstreamDependencyFailed(_) => StatusCode::FAILED_DEPENDENCY,
                IngestError::UnknownNeighborhood(_) | IngestError::UnknownFaultType(_) => {
                    StatusCode::NOT_FOUND
                }
                IngestError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Ingest(err) => match err {
                IngestError::InvalidInput(_) => "invalid_input",
                IngestError::UpstreamDependencyFailed(_) => "upstream_dependency_failed",
                IngestError::UnknownNeighborhood(_) => "unknown_neighborhood",
                IngestError::UnknownFaultType(_) => "unknown_fault_type",
                IngestError::StoreUnavailable(_) => "store_unavailable",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            // Store detail stays in the logs.
            ApiError::Ingest(IngestError::StoreUnavailable(err)) => {
                tracing::error!(error = %err, "Store failure");
                "storage is temporarily unavailable".to_string()
            }
            ApiError::Ingest(err @ IngestError::UpstreamDependencyFailed(_)) => {
                tracing::error!(error = %err, "Geocoding failure");
                err.to_string()
            }
            ApiError::Ingest(err) => {
                tracing::warn!(error = %err, code, "Detection rejected");
                err.to_string()
            }
        };

        (status, Json(serde_json::json!({ "error": message, "code": code }))).into_response()
    }
}
