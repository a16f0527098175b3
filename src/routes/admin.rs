use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::{
    error::AppResult,
    middleware::admin::AdminUser,
    models::{
        audit::{AuditEntry, AuditPage, AuditQuery},
        feature_flag::{FeatureFlag, SetFeatureFlagRequest},
        prompt::{CreatePromptVersionRequest, PromptVersion},
    },
    AppState,
};

// ── Feature flags ───────────────────────────────────────────────────────────

pub async fn list_feature_flags(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<FeatureFlag>>> {
    Ok(Json(state.services.feature_flags.list().await?))
}

pub async fn set_feature_flag(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(key): Path<String>,
    Json(body): Json<SetFeatureFlagRequest>,
) -> AppResult<Json<FeatureFlag>> {
    let flag = state
        .services
        .feature_flags
        .set_flag(&key, body.enabled, body.description.as_deref(), Some(admin.user_id))
        .await?;

    state.services.audit.log(
        AuditEntry::new(admin.user_id, "feature_flag.set")
            .resource("feature_flag", &key)
            .details(json!({ "enabled": flag.enabled })),
    );
    Ok(Json(flag))
}

// ── Prompts ─────────────────────────────────────────────────────────────────

pub async fn list_prompt_versions(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(key): Path<String>,
) -> AppResult<Json<Vec<PromptVersion>>> {
    Ok(Json(state.services.prompts.list_versions(&key).await?))
}

pub async fn create_prompt_version(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(key): Path<String>,
    Json(body): Json<CreatePromptVersionRequest>,
) -> AppResult<(StatusCode, Json<PromptVersion>)> {
    let prompt = state
        .services
        .prompts
        .create_version(
            &key,
            &body.content,
            body.model.as_deref(),
            Some(admin.user_id),
            body.activate,
        )
        .await?;

    state.services.audit.log(
        AuditEntry::new(admin.user_id, "prompt.create")
            .resource("prompt", &key)
            .details(json!({ "version": prompt.version, "active": prompt.is_active })),
    );
    Ok((StatusCode::CREATED, Json(prompt)))
}

pub async fn activate_prompt_version(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((key, version)): Path<(String, i32)>,
) -> AppResult<Json<PromptVersion>> {
    let prompt = state.services.prompts.activate_version(&key, version).await?;

    state.services.audit.log(
        AuditEntry::new(admin.user_id, "prompt.activate")
            .resource("prompt", &key)
            .details(json!({ "version": version })),
    );
    Ok(Json(prompt))
}

// ── Audit log ───────────────────────────────────────────────────────────────

pub async fn list_audit_log(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<AuditPage>> {
    Ok(Json(state.services.audit.list(&params).await?))
}
