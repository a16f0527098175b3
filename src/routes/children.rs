use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        approval::ProductApproval,
        audit::AuditEntry,
        auth::AuthenticatedUser,
        child::{AddGuardianRequest, Child, CreateChildRequest, ManagedChild, UpdateChildRequest},
    },
    AppState,
};

/// Children only ever see themselves; parents and admins manage profiles.
fn require_parent(user: &AuthenticatedUser) -> AppResult<()> {
    if user.is_parent() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn list_children(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Child>>> {
    if !user.is_parent() {
        let me = state.services.family.get_child(user.user_id).await?;
        return Ok(Json(vec![me]));
    }
    Ok(Json(state.services.family.list_children(user.user_id).await?))
}

pub async fn create_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateChildRequest>,
) -> AppResult<(StatusCode, Json<Child>)> {
    require_parent(&user)?;
    let child = state.services.family.create_child(user.user_id, &body).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "child.create").resource("child", child.id),
    );
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn update_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChildRequest>,
) -> AppResult<Json<Child>> {
    require_parent(&user)?;
    let child = state.services.family.update_child(&user, id, &body).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "child.update").resource("child", child.id),
    );
    Ok(Json(child))
}

pub async fn delete_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_parent(&user)?;
    state.services.family.delete_child(&user, id).await?;

    state.services.audit.log(AuditEntry::new(user.user_id, "child.delete").resource("child", id));
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_guardian(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddGuardianRequest>,
) -> AppResult<(StatusCode, Json<ManagedChild>)> {
    require_parent(&user)?;
    let link = state.services.family.add_guardian(&user, id, &body).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "child.guardian_add")
            .resource("child", id)
            .details(json!({ "parent_id": body.parent_id, "relationship": body.relationship })),
    );
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn remove_guardian(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, parent_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    require_parent(&user)?;
    state.services.family.remove_guardian(&user, id, parent_id).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "child.guardian_remove")
            .resource("child", id)
            .details(json!({ "parent_id": parent_id })),
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /children/{id}/approvals: request history for one child.
pub async fn list_child_approvals(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ProductApproval>>> {
    Ok(Json(state.services.approvals.list_for_child(&user, id).await?))
}
