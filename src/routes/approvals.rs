use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        approval::{
            ApprovalAction, ApprovalDetail, ApproveRequest, DeclineRequest, PendingApproval,
            ProductApproval, ReviewRequest,
        },
        audit::AuditEntry,
        auth::AuthenticatedUser,
    },
    services::approvals::ApprovalOutcome,
    AppState,
};

/// Body for POST /approvals/request. Children omit `child_id`.
#[derive(Debug, Deserialize)]
pub struct RequestReviewBody {
    pub child_id: Option<Uuid>,
    #[serde(flatten)]
    pub request: ReviewRequest,
}

pub async fn list_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<PendingApproval>>> {
    if !user.is_parent() {
        return Err(AppError::Forbidden);
    }
    Ok(Json(state.services.approvals.get_pending_approvals(user.user_id).await?))
}

pub async fn get_approval(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApprovalDetail>> {
    Ok(Json(state.services.approvals.get_approval(&user, id).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ApproveRequest>>,
) -> AppResult<Json<ApprovalOutcome>> {
    if !user.is_parent() {
        return Err(AppError::Forbidden);
    }
    let Json(body) = body.unwrap_or_default();
    let action = ApprovalAction::approve(id, user.user_id, body);
    let outcome = state.services.approvals.approve_product(action).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "approval.approve")
            .resource("approval", id)
            .details(json!({
                "child_id": outcome.approval.child_id,
                "product_name": outcome.approval.product_name,
                "warnings": outcome.warnings,
            })),
    );
    Ok(Json(outcome))
}

pub async fn decline(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Option<Json<DeclineRequest>>,
) -> AppResult<Json<ApprovalOutcome>> {
    if !user.is_parent() {
        return Err(AppError::Forbidden);
    }
    let Json(body) = body.unwrap_or_default();
    let action = ApprovalAction::decline(id, user.user_id, body);
    let outcome = state.services.approvals.decline_product(action).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "approval.decline")
            .resource("approval", id)
            .details(json!({
                "child_id": outcome.approval.child_id,
                "product_name": outcome.approval.product_name,
            })),
    );
    Ok(Json(outcome))
}

/// POST /approvals/request: ask for review outside the wishlist (scanner,
/// product page).
pub async fn request_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RequestReviewBody>,
) -> AppResult<(StatusCode, Json<ProductApproval>)> {
    let child_id = match body.child_id {
        Some(id) => id,
        None if !user.is_parent() => user.user_id,
        None => return Err(AppError::validation("child_id is required")),
    };
    state.services.family.ensure_access(&user, child_id).await?;

    let approval = state
        .services
        .approvals
        .request_review(child_id, body.request, "direct")
        .await?;
    Ok((StatusCode::CREATED, Json(approval)))
}
