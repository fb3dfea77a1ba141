//! Session token authentication extractor.
//!
//! Validates the auth provider's session JWT from the `Authorization` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::jwt::{JwtError, SessionClaims};

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated user information from the session token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// Auth provider user ID from the `sub` claim.
    pub user_id: String,
    /// Primary email, when the session token carries it.
    pub email: Option<String>,
    pub session_id: Option<String>,
}

impl From<SessionClaims> for UserAuth {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            session_id: claims.sid,
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<Result<&str, ApiError>> {
    let header = parts.headers.get("Authorization")?;
    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        });
    Some(token)
}

fn authenticate(state: &AppState, token: &str) -> Result<UserAuth, ApiError> {
    state
        .verifier
        .verify(token)
        .map(UserAuth::from)
        .map_err(|e| match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid or expired token".to_string()),
        })
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError::Unauthorized("Missing Authorization header".to_string())
        })??;
        authenticate(state, token)
    }
}

/// Optional authentication.
///
/// Missing credentials yield `None`; credentials that are present but
/// invalid are still rejected.
#[derive(Debug, Clone)]
pub struct OptionalUserAuth(pub Option<UserAuth>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(OptionalUserAuth(None)),
            Some(token) => Ok(OptionalUserAuth(Some(authenticate(state, token?)?))),
        }
    }
}
