//! Registration, login and session resolution.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Json, State};
use axum::http::{header, HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::AppError;
use crate::store::Store;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub session_id: Uuid,
    pub email: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<StatusCode, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::Hash)?;
    state.store.create_user(&payload.email, &password_hash).await?;
    Ok(StatusCode::CREATED)
}

/// Verifies the password and issues an opaque session id. The session id is
/// what the WebSocket join packet carries.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let stored = state
        .store
        .password_hash(&payload.email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let parsed = PasswordHash::new(&stored).map_err(|_| AppError::Hash)?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)?;
    let session_id = state.store.create_session(&payload.email).await?;
    Ok(Json(LoginResponse { session_id, email: payload.email }))
}

/// Resolves the `Authorization: Bearer <session>` header to a player email.
pub async fn authenticate(store: &Store, headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = value.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
    let session = Uuid::parse_str(token.trim()).map_err(|_| AppError::Unauthorized)?;
    store.session_email(session).await?.ok_or(AppError::Unauthorized)
}
