use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        notification::{Notification, RegisterPushTokenRequest},
    },
    AppState,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(state.services.notifications.list_for_user(user.user_id).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.services.notifications.mark_read(id, user.user_id).await? {
        return Err(AppError::NotFound("Notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn register_push_token(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RegisterPushTokenRequest>,
) -> AppResult<StatusCode> {
    if !matches!(body.platform.as_str(), "ios" | "android") {
        return Err(AppError::validation("platform must be ios or android"));
    }
    if body.token.trim().is_empty() {
        return Err(AppError::validation("token is required"));
    }
    state
        .services
        .notifications
        .register_push_token(user.user_id, &body.platform, body.token.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
