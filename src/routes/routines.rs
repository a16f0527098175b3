use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        auth::AuthenticatedUser,
        routine::{AddRoutineStepRequest, RoutineQuery, RoutineStep},
    },
    AppState,
};

pub async fn list_routine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(child_id): Path<Uuid>,
    Query(params): Query<RoutineQuery>,
) -> AppResult<Json<Vec<RoutineStep>>> {
    let steps = state.services.routines.list(&user, child_id, params.slot).await?;
    Ok(Json(steps))
}

pub async fn add_step(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(child_id): Path<Uuid>,
    Json(body): Json<AddRoutineStepRequest>,
) -> AppResult<(StatusCode, Json<RoutineStep>)> {
    let step = state.services.routines.add_step(&user, child_id, &body).await?;
    Ok((StatusCode::CREATED, Json(step)))
}

pub async fn remove_step(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.routines.remove_step(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
