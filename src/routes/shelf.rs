use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        auth::AuthenticatedUser,
        shelf::{ChildProduct, ShelfItem, UpdateChildProductRequest},
    },
    AppState,
};

pub async fn list_shelf(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(child_id): Path<Uuid>,
) -> AppResult<Json<Vec<ShelfItem>>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.services.shelf.list_shelf(&user, child_id, today).await?))
}

pub async fn expiry_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let today = Utc::now().date_naive();
    let status = state.services.shelf.get_expiry_status(&user, id, today).await?;
    Ok(Json(json!({ "id": id, "expiry_status": status })))
}

pub async fn record_usage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ChildProduct>> {
    Ok(Json(state.services.shelf.record_usage(&user, id).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChildProductRequest>,
) -> AppResult<Json<ChildProduct>> {
    Ok(Json(state.services.shelf.update_product(&user, id, &body).await?))
}

pub async fn remove_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.shelf.remove_product(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
