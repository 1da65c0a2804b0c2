use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{
    jwt::{create_access_token, AccessToken},
    middleware::AuthUser,
    password::{hash_password, verify_password},
};
use crate::error::{AppError, AppResult};
use crate::models::user::{User, UserProfile};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<AccessToken>> {
    if body.email.is_empty() || body.password.len() < 8 {
        return Err(AppError::Validation(
            "Email required and password must be at least 8 characters".into(),
        ));
    }

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let pwd_hash = hash_password(&body.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, name)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.email)
    .bind(&pwd_hash)
    .bind(&body.name)
    .fetch_one(&state.db)
    .await?;

    let token = create_access_token(user.id, &user.email, &state.config)?;
    Ok(Json(token))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AccessToken>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let token = create_access_token(user.id, &user.email, &state.config)?;
    Ok(Json(token))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}

/// Sign-out tears down the user's cached entry store.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    state.stores.evict(auth_user.id).await;
    Ok(Json(serde_json::json!({ "signed_out": true })))
}
