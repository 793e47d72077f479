use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use binwise_core::{BinwiseError, ClassifyError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Lowest detector confidence accepted for classification.
pub const MIN_PROBABILITY: f64 = 0.5;

/// Body of `POST /classify`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    pub object_name: String,
    /// Detector confidence for the object; not used by the resolver.
    pub probability: f64,
}

impl ClassifyRequest {
    /// Checks the request before any collaborator is called.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.object_name.is_empty() {
            return Err(ApiError::bad_request("Invalid Request"));
        }
        if self.probability.is_nan() || self.probability < MIN_PROBABILITY {
            return Err(ApiError::bad_request("Probability must be at least 0.5"));
        }
        Ok(())
    }
}

/// An error response: `{"detail": ..., "stage"?: ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
    pub stage: Option<&'static str>,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
            stage: None,
        }
    }
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        // A dead graph store means the service itself is down; the other
        // stages are upstream dependencies failing.
        let status = match err {
            ClassifyError::LookupFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            detail: err.to_string(),
            stage: Some(err.stage()),
        }
    }
}

impl From<BinwiseError> for ApiError {
    fn from(err: BinwiseError) -> Self {
        let status = match err {
            BinwiseError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
            stage: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.stage {
            Some(stage) => serde_json::json!({"detail": self.detail, "stage": stage}),
            None => serde_json::json!({"detail": self.detail}),
        };
        (self.status, Json(body)).into_response()
    }
}

/// `POST /classify`
///
/// Missing or mistyped fields are rejected by the JSON extractor with 422.
pub async fn classify_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    match state.resolver.classify(&request.object_name).await {
        Ok(classification) => {
            info!(
                object = %classification.object_name,
                probability = request.probability,
                "Classification served"
            );
            Ok(Json(classification).into_response())
        }
        Err(e) => {
            warn!(object = %request.object_name, stage = e.stage(), error = %e, "Classification failed");
            Err(e.into())
        }
    }
}
