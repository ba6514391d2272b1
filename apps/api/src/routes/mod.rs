pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers as generation;
use crate::keywords::handlers as keywords;
use crate::profiles::handlers as profiles;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Keyword preview
        .route("/api/v1/analyze", post(keywords::handle_analyze))
        // Generation
        .route("/api/v1/generate", post(generation::handle_generate))
        .route(
            "/api/v1/generate/complete",
            post(generation::handle_generate_complete),
        )
        // Profiles
        .route("/api/v1/users", post(profiles::handle_create_user))
        .route(
            "/api/v1/users/onboarding",
            post(profiles::handle_onboarding),
        )
        .route(
            "/api/v1/users/:id",
            get(profiles::handle_get_profile).put(profiles::handle_update_user),
        )
        .route(
            "/api/v1/users/email/:email",
            get(profiles::handle_get_user_by_email),
        )
        .with_state(state)
}
