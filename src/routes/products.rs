use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        auth::AuthenticatedUser,
        product::{Product, ProductSearchQuery},
    },
    AppState,
};

pub async fn search_products(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ProductSearchQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.services.products.search(&params.q, params.limit).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.services.products.get(id).await?))
}

pub async fn get_by_barcode(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.services.products.get_by_barcode(&code).await?))
}
