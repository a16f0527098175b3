use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        audit::AuditEntry,
        auth::AuthenticatedUser,
        shelf::ChildProduct,
        wishlist::{
            AddWishlistItemRequest, CreateWishlistGroupRequest, RequestApprovalBody,
            SetWishlistStatusRequest, UpdateWishlistGroupRequest, UpdateWishlistItemRequest,
            WishlistGroup, WishlistGroupSummary, WishlistItem, WishlistItemView, WishlistQuery,
        },
    },
    services::wishlist::ApprovalRequested,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub profile_id: Option<Uuid>,
}

/// A child's own wishlist unless a parent names the profile.
fn resolve_profile(user: &AuthenticatedUser, profile_id: Option<Uuid>) -> AppResult<Uuid> {
    match profile_id {
        Some(id) => Ok(id),
        None if !user.is_parent() => Ok(user.user_id),
        None => Err(AppError::validation("profile_id is required")),
    }
}

// ── Items ───────────────────────────────────────────────────────────────────

pub async fn list_items(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<WishlistQuery>,
) -> AppResult<Json<Vec<WishlistItemView>>> {
    let profile_id = resolve_profile(&user, params.profile_id)?;
    let items = state
        .services
        .wishlist
        .list_items(&user, profile_id, params.status)
        .await?;
    Ok(Json(items))
}

pub async fn add_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ProfileQuery>,
    Json(body): Json<AddWishlistItemRequest>,
) -> AppResult<(StatusCode, Json<WishlistItemView>)> {
    let profile_id = resolve_profile(&user, params.profile_id)?;
    let item = state.services.wishlist.add_item(&user, profile_id, &body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateWishlistItemRequest>,
) -> AppResult<Json<WishlistItem>> {
    let item = state
        .services
        .wishlist
        .update_item(&user, id, body.notes.as_deref())
        .await?;
    Ok(Json(item))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.wishlist.remove_item(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SetWishlistStatusRequest>,
) -> AppResult<Json<WishlistItem>> {
    let item = state.services.wishlist.set_status(&user, id, body.status).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "wishlist.status")
            .resource("wishlist_item", id)
            .details(json!({ "status": item.status })),
    );
    Ok(Json(item))
}

pub async fn request_approval(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Option<Json<RequestApprovalBody>>,
) -> AppResult<(StatusCode, Json<ApprovalRequested>)> {
    let child_notes = body.and_then(|Json(b)| b.child_notes);
    let requested = state
        .services
        .wishlist
        .request_approval(&user, id, child_notes)
        .await?;
    Ok((StatusCode::CREATED, Json(requested)))
}

pub async fn move_to_shelf(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ChildProduct>> {
    let product = state.services.wishlist.move_to_shelf(&user, id).await?;

    state.services.audit.log(
        AuditEntry::new(user.user_id, "wishlist.shelve")
            .resource("wishlist_item", id)
            .details(json!({ "child_product_id": product.id })),
    );
    Ok(Json(product))
}

// ── Groups ──────────────────────────────────────────────────────────────────

pub async fn list_groups(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ProfileQuery>,
) -> AppResult<Json<Vec<WishlistGroupSummary>>> {
    let profile_id = resolve_profile(&user, params.profile_id)?;
    Ok(Json(state.services.wishlist.list_groups(&user, profile_id).await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ProfileQuery>,
    Json(body): Json<CreateWishlistGroupRequest>,
) -> AppResult<(StatusCode, Json<WishlistGroup>)> {
    let profile_id = resolve_profile(&user, params.profile_id)?;
    let group = state.services.wishlist.create_group(&user, profile_id, &body).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateWishlistGroupRequest>,
) -> AppResult<Json<WishlistGroup>> {
    Ok(Json(state.services.wishlist.update_group(&user, id, &body).await?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.wishlist.delete_group(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn group_items(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<WishlistItem>>> {
    Ok(Json(state.services.wishlist.group_items(&user, id).await?))
}

pub async fn add_item_to_group(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((group_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .services
        .wishlist
        .add_item_to_group(&user, item_id, group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_item_from_group(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((group_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .services
        .wishlist
        .remove_item_from_group(&user, item_id, group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn child_defaults_to_own_profile() {
        let child = user(UserRole::Child);
        assert_eq!(resolve_profile(&child, None).unwrap(), child.user_id);
    }

    #[test]
    fn parent_must_name_a_profile() {
        let parent = user(UserRole::Parent);
        assert!(matches!(resolve_profile(&parent, None), Err(AppError::Validation(_))));
        let kid = Uuid::new_v4();
        assert_eq!(resolve_profile(&parent, Some(kid)).unwrap(), kid);
    }
}
