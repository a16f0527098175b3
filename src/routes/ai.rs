use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    middleware::rate_limit::{ai_chat_key, check_rate_limit},
    models::auth::AuthenticatedUser,
    services::ai::{ChatReply, ChatRequest},
    AppState,
};

pub async fn chat(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    let mut redis = state.redis.clone();
    check_rate_limit(
        &mut redis,
        &ai_chat_key(user.user_id),
        state.config.ai_rate_limit_per_minute,
        60,
    )
    .await?;

    let reply = state.services.ai.chat(&body.messages).await?;
    tracing::debug!(user_id = %user.user_id, model = %reply.model, "ai chat answered");
    Ok(Json(reply))
}
