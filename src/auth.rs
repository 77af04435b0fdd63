//! Token authentication for the protected API actions.
//!
//! Clients send `Authorization: Token <token>`; the token is the one stored on
//! the user row when the user was created.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::entities::user;
use crate::error::AppError;
use crate::store;
use crate::AppState;

const TOKEN_PREFIX: &str = "Token ";

/// The authenticated caller. Extracting it rejects the request with 401 before
/// the handler runs, so protected handlers never touch state for anonymous calls.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(TOKEN_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("authentication credentials were not provided".to_string()))?;

        match store::find_user_by_token(&state.db, token).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                tracing::debug!("Rejected request with unknown token");
                Err(AppError::Unauthorized("invalid token".to_string()))
            }
        }
    }
}
