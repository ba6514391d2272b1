//! Axum route handler for the keyword preview endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::keywords::extractor::Term;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub keywords: Vec<Term>,
}

/// POST /api/v1/analyze
///
/// Returns the ranked terms the generation pipeline would extract from a posting.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let keywords = state.extractor.extract(&request.job_description);
    Ok(Json(AnalyzeResponse { keywords }))
}
