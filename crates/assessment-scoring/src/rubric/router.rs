use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::evaluation::EvaluationPolicy;
use super::normalizer::{validate_template, ValidationResult};
use super::report::ReportView;
use super::repository::{EvaluationKey, ReportStore, StoreError, TemplateStore};
use super::response::ResponseSet;
use super::service::{ScoringService, ScoringServiceError};
use super::template::{Template, TemplateId};

/// Body of `POST /api/v1/evaluations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub response_set: ResponseSet,
    #[serde(default)]
    pub policy: Option<EvaluationPolicy>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub key: EvaluationKey,
    pub stored_at: DateTime<Utc>,
    pub report: ReportView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub template_id: TemplateId,
    pub valid: bool,
    #[serde(flatten)]
    pub result: ValidationResult,
}

impl ValidationResponse {
    fn new(template_id: TemplateId, result: ValidationResult) -> Self {
        Self {
            template_id,
            valid: result.is_valid(),
            result,
        }
    }
}

/// Router exposing evaluation and template validation endpoints.
pub fn scoring_router<T, R>(service: Arc<ScoringService<T, R>>) -> Router
where
    T: TemplateStore + 'static,
    R: ReportStore + 'static,
{
    Router::new()
        .route("/api/v1/evaluations", post(evaluate_handler::<T, R>))
        .route(
            "/api/v1/templates/:template_id/validation",
            get(template_validation_handler::<T, R>),
        )
        .route(
            "/api/v1/templates/validate",
            post(validate_template_handler::<T, R>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<T, R>(
    State(service): State<Arc<ScoringService<T, R>>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    T: TemplateStore + 'static,
    R: ReportStore + 'static,
{
    let policy = request.policy.unwrap_or(*service.policy());
    match service.evaluate_with(&request.response_set, &policy) {
        Ok(stored) => {
            let body = EvaluationResponse {
                report: stored.report.view(),
                key: stored.key,
                stored_at: stored.stored_at,
            };
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn template_validation_handler<T, R>(
    State(service): State<Arc<ScoringService<T, R>>>,
    Path(template_id): Path<String>,
) -> Response
where
    T: TemplateStore + 'static,
    R: ReportStore + 'static,
{
    let id = TemplateId(template_id);
    match service.validate(&id) {
        Ok(result) => {
            (StatusCode::OK, axum::Json(ValidationResponse::new(id, result))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn validate_template_handler<T, R>(
    State(service): State<Arc<ScoringService<T, R>>>,
    axum::Json(template): axum::Json<Template>,
) -> Response
where
    T: TemplateStore + 'static,
    R: ReportStore + 'static,
{
    let result = validate_template(&template, service.policy());
    let body = ValidationResponse::new(template.id, result);
    (StatusCode::OK, axum::Json(body)).into_response()
}

fn error_response(error: ScoringServiceError) -> Response {
    let status = match &error {
        ScoringServiceError::InvalidPolicy { .. } => StatusCode::BAD_REQUEST,
        ScoringServiceError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
        ScoringServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        ScoringServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        ScoringServiceError::Store(StoreError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
