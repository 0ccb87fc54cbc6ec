use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::{
    analysis::{AnalyzeError, AnalyzeRequest},
    app::AppState,
};

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Llm(_) => StatusCode::BAD_GATEWAY,
        };
        match &self {
            Self::Validation(error) => warn!(%error, "rejected analyze request"),
            Self::Configuration(error) => error!(%error, "analysis service is misconfigured"),
            Self::Llm(error) => error!(%error, "narrative generation failed"),
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

pub(crate) async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed analyze payload");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse::new(rejection.body_text())),
            )
                .into_response();
        }
    };

    match state.analysis().analyze(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error.into_response(),
    }
}
