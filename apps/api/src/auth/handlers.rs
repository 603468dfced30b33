use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, CurrentUser, Role};
use crate::errors::AppError;
use crate::models::user::{UserProfile, UserRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// POST /token
pub async fn handle_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(form.username.trim())
        .fetch_optional(&state.db)
        .await?;

    let user = match user {
        Some(user) if verify_password(&form.password, &user.hashed_password) => user,
        _ => return Err(AppError::Unauthorized),
    };

    let access_token = state.jwt.issue(&user)?;
    info!(username = %user.username, "access token issued");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.jwt.ttl_seconds(),
    }))
}

/// POST /users (admin only)
pub async fn handle_create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    current.require_admin()?;

    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Gebruikersnaam en wachtwoord zijn verplicht.".to_string(),
        ));
    }

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Validation(
            "Deze gebruikersnaam is al in gebruik.".to_string(),
        ));
    }

    let user: UserRow = sqlx::query_as(
        "INSERT INTO users (id, username, hashed_password, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(hash_password(&req.password)?)
    .bind(req.role.unwrap_or(Role::User).as_str())
    .fetch_one(&state.db)
    .await?;

    info!(
        username = %user.username,
        role = %user.role,
        created_by = %current.username,
        "user created"
    );
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// GET /me
pub async fn handle_me(Extension(current): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(UserProfile {
        username: current.username,
        role: current.role.as_str().to_string(),
    })
}

/// GET /verify-token/:token
pub async fn handle_verify_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    state
        .jwt
        .verify(&token)
        .map_err(|_| AppError::Forbidden("Token is ongeldig of verlopen.".to_string()))?;
    Ok(Json(json!({ "message": "Token is geldig." })))
}
