use crate::auth::{AuthUser, BearerToken};
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::models::{
    AddCaloriesRequest, CurrentUserResponse, GoalRequest, GoalResponse, RegisterRequest,
    RegisterResponse, ResetResponse, StatusResponse, TokenResponse, UserId, UserProfile,
    WeeklySummary,
};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let response = state.accounts.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<TokenResponse>, AppError> {
    Ok(Json(state.accounts.refresh_token(&token).await?))
}

pub async fn user_by_id(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::not_found("user not found"))?;
    Ok(Json(state.accounts.profile(UserId(id)).await?))
}

pub async fn user_by_email(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(email): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.accounts.profile_by_email(&email).await?))
}

pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CurrentUserResponse>, AppError> {
    Ok(Json(state.ledger.current_user(user_id).await?))
}

pub async fn get_calories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StatusResponse>, AppError> {
    Ok(Json(state.ledger.get_status(user_id).await?))
}

pub async fn add_calories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<AddCaloriesRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    Ok(Json(state.ledger.add_calories(user_id, payload.calories).await?))
}

pub async fn set_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<GoalRequest>,
) -> Result<Json<GoalResponse>, AppError> {
    Ok(Json(state.ledger.set_goal(user_id, payload.goal).await?))
}

pub async fn reset_today(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ResetResponse>, AppError> {
    Ok(Json(state.ledger.reset_today(user_id).await?))
}

pub async fn weekly_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<WeeklySummary>, AppError> {
    Ok(Json(state.ledger.weekly_summary(user_id).await?))
}
