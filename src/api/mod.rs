use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ResolutionError,
    models::{AirQualityReport, PollutantDataset},
    pipeline::AirQualityPipeline,
};

#[derive(Deserialize)]
pub struct ReportParams {
    #[serde(default)]
    pub place: String,
}

#[derive(Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub retryable: bool,
}

pub struct ResolutionFailure(ResolutionError);

impl IntoResponse for ResolutionFailure {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ResolutionError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResolutionError::TransportError { .. } => StatusCode::BAD_GATEWAY,
        };
        let body = ApiError {
            error: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(pipeline: Arc<AirQualityPipeline>) -> Router {
    Router::new()
        .route("/report", get(get_report))
        .route("/dataset", get(get_dataset))
        .with_state(pipeline)
}

/// 204 while the place is blank, the report otherwise
async fn get_report(
    State(pipeline): State<Arc<AirQualityPipeline>>,
    Query(params): Query<ReportParams>,
) -> Result<Response, ResolutionFailure> {
    match pipeline.run(&params.place).await.map_err(ResolutionFailure)? {
        Some(report) => Ok(Json::<AirQualityReport>(report).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn get_dataset(State(pipeline): State<Arc<AirQualityPipeline>>) -> Json<PollutantDataset> {
    Json(pipeline.dataset().clone())
}
