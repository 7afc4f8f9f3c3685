//! `CurrentUser` request extractor — grounded on the teacher's `AuthUser`
//! (`api.rs`), generalized from JWT validation to an opaque-token session
//! lookup against the store.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

pub struct CurrentUser {
    pub user_id: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

        let session = state
            .store
            .find_session(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser {
            user_id: session.user_id,
        })
    }
}
