//! Registration and login routes

use axum::{http::StatusCode, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::{hash_password, verify_password, TokenKeys};
use crate::db::{User, UserRepository};
use crate::error::{AppError, Result};

/// Extended state with database pool and token keys
#[derive(Clone)]
pub struct AuthRoutesState {
    pub pool: SqlitePool,
    pub keys: TokenKeys,
}

/// Create the auth router
pub fn router(pool: SqlitePool, keys: TokenKeys) -> Router {
    let state = AuthRoutesState { pool, keys };

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(Extension(state))
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// User fields safe to return to clients
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicUser {
    id: String,
    name: String,
    email: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: PublicUser,
}

/// Register a new account
async fn register(
    Extension(state): Extension<AuthRoutesState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let name = request.name.trim();
    let email = request.email.trim();

    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let password_hash = hash_password(&request.password)?;

    let repo = UserRepository::new(&state.pool);
    let user = repo.create(name, email, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Registered new user");

    let token = state.keys.issue(&user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// Log in with email and password
async fn login(
    Extension(state): Extension<AuthRoutesState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let repo = UserRepository::new(&state.pool);

    // Unknown email and wrong password are indistinguishable
    let user = repo
        .find_by_email(request.email.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = state.keys.issue(&user.id)?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}
