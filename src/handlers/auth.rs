//! Registration and login (§6 `POST /v1/auth/register`, `/login`).

use axum::extract::State;
use axum::Json;

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::ids;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, Session, User, UserPublic};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(axum::http::StatusCode, Json<AuthResponse>)> {
    if !state.config.auth.allow_registration {
        return Err(AppError::Forbidden);
    }
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(AppError::BadRequest("invalid email".into()));
    }
    if body.username.trim().len() < 2 {
        return Err(AppError::BadRequest("username too short".into()));
    }
    if body.password.len() < 8 {
        return Err(AppError::BadRequest("password must be at least 8 characters".into()));
    }

    let email = body.email.trim().to_lowercase();
    let username = body.username.trim().to_lowercase();

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("email already registered".into()));
    }
    if state.store.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("username already taken".into()));
    }

    let user = User {
        id: ids::generate(ids::prefix::USER),
        email,
        username,
        display_name: body.display_name.trim().to_string(),
        avatar_hash: None,
        password_hash: auth::hash_password(&body.password)?,
        created_at: ids::now(),
    };
    let user = state.store.create_user(user).await?;

    let session = Session {
        token: auth::generate_session_token(),
        user_id: user.id.clone(),
        created_at: ids::now(),
    };
    let session = state.store.create_session(session).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token,
            user: UserPublic::from(user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let identifier = body.identifier.trim().to_lowercase();
    let user = if identifier.contains('@') {
        state.store.find_user_by_email(&identifier).await?
    } else {
        state.store.find_user_by_username(&identifier).await?
    };
    let user = user.ok_or(AppError::Unauthorized)?;

    if !auth::verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let session = Session {
        token: auth::generate_session_token(),
        user_id: user.id.clone(),
        created_at: ids::now(),
    };
    let session = state.store.create_session(session).await?;

    Ok(Json(AuthResponse {
        token: session.token,
        user: UserPublic::from(user),
    }))
}
