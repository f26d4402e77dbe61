use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::blocking;
use crate::error::AppError;
use crate::models::identity::{Identity, Role};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub code: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub identity: Identity,
}

pub fn bearer_token(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Unauthorized("malformed bearer token".to_string()))
}

/// Resolves the identity behind the request's bearer token.
pub fn current_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let token = bearer_token(headers)?;
    state.sessions.resolve(token)
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (token, identity) = blocking(&state, move |state| {
        state.sessions.login(
            state.verifier.as_ref(),
            &payload.phone,
            &payload.code,
            payload.role,
        )
    })
    .await?;
    state.metrics.active_sessions.set(state.sessions.len() as i64);

    Ok(Json(LoginResponse { token, identity }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers)?;
    blocking(&state, move |state| state.sessions.logout(token)).await?;
    state.metrics.active_sessions.set(state.sessions.len() as i64);

    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Identity>, AppError> {
    Ok(Json(current_identity(&state, &headers)?))
}
