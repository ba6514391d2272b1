//! Axum route handlers for the Generation API.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::pipeline::{load_profile, Relay};
use crate::state::AppState;

const NDJSON: &str = "application/x-ndjson";
const SOURCE: &str = "llm";

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub content: String,
    pub source: &'static str,
}

fn validate(request: &GenerateRequest) -> Result<(), AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// One NDJSON line per relay item. The final event is followed by a
/// `{"source"}` line; an error becomes the last line of the body.
fn ndjson_lines(relay: Relay) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    relay.map(|item| {
        let mut out = match item {
            Ok(event) => {
                let mut line = json!({ "chunk": event.fragment, "done": event.is_final }).to_string();
                if event.is_final {
                    line.push('\n');
                    line.push_str(&json!({ "source": SOURCE }).to_string());
                }
                line
            }
            Err(e) => {
                warn!("Generation stream aborted after headers were sent: {e}");
                json!({ "error": e.to_string() }).to_string()
            }
        };
        out.push('\n');
        Ok(Bytes::from(out))
    })
}

/// POST /api/v1/generate
///
/// Streams the resume as it is generated. Anything that fails before the
/// backend starts answering is an ordinary error response.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, AppError> {
    validate(&request)?;

    let profile = load_profile(state.profiles.as_ref(), request.user_id).await?;
    let relay = state
        .pipeline
        .open_relay(profile.as_ref(), &request.job_description)
        .await?;

    let body = Body::from_stream(ndjson_lines(relay));
    Ok(([(header::CONTENT_TYPE, NDJSON)], body).into_response())
}

/// POST /api/v1/generate/complete
pub async fn handle_generate_complete(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    validate(&request)?;

    let profile = load_profile(state.profiles.as_ref(), request.user_id).await?;
    let content = state
        .pipeline
        .complete(profile.as_ref(), &request.job_description)
        .await?;

    Ok(Json(CompleteResponse {
        content,
        source: SOURCE,
    }))
}
