use crate::errors::AppError;
use crate::models::UserId;
use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};

/// Raw token from `Authorization: Bearer <token>`, not yet resolved.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        auth.strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(|| AppError::unauthorized("invalid auth scheme"))
    }
}

/// The authenticated caller.
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        match state.accounts.resolve_token(&token).await? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => Err(AppError::unauthorized("invalid or expired token")),
        }
    }
}
