use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileSnapshot, UserProfile};
use crate::profiles::repository::{OnboardingRequest, UserFields};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub id: Uuid,
}

/// POST /api/v1/users/onboarding
pub async fn handle_onboarding(
    State(state): State<AppState>,
    Json(request): Json<OnboardingRequest>,
) -> Result<(StatusCode, Json<OnboardingResponse>), AppError> {
    let id = state.profile_store.create_profile(&request).await?;
    Ok((StatusCode::CREATED, Json(OnboardingResponse { id })))
}

/// POST /api/v1/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    Json(user): Json<UserFields>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let created = state.profile_store.create_user(&user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/users/:id
pub async fn handle_update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(user): Json<UserFields>,
) -> Result<Json<UserProfile>, AppError> {
    let updated = state.profile_store.update_user(id, &user).await?;
    Ok(Json(updated))
}

/// GET /api/v1/users/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileSnapshot>, AppError> {
    let profile = state
        .profiles
        .get_profile_with_details(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    Ok(Json(profile))
}

/// GET /api/v1/users/email/:email
pub async fn handle_get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .profile_store
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with email {email} not found")))?;
    Ok(Json(user))
}
