use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: usize,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let token = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.config.jwt_expiration,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}
