pub mod admin;
pub mod ai;
pub mod approvals;
pub mod children;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod products;
pub mod routines;
pub mod shelf;
pub mod wishlist;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{middleware::auth::JwtSecret, AppState};

/// Every API route. Authentication happens per handler through the
/// `AuthenticatedUser` / `AdminUser` extractors.
pub fn router(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Catalog
        .route("/products/search", get(products::search_products))
        .route("/products/barcode/{code}", get(products::get_by_barcode))
        .route("/products/{id}", get(products::get_product))
        // Family
        .route("/children", get(children::list_children).post(children::create_child))
        .route("/children/{id}", put(children::update_child).delete(children::delete_child))
        .route("/children/{id}/approvals", get(children::list_child_approvals))
        .route("/children/{id}/guardians", post(children::add_guardian))
        .route("/children/{id}/guardians/{parent_id}", delete(children::remove_guardian))
        // Approvals
        .route("/approvals/pending", get(approvals::list_pending))
        .route("/approvals/request", post(approvals::request_review))
        .route("/approvals/{id}", get(approvals::get_approval))
        .route("/approvals/{id}/approve", post(approvals::approve))
        .route("/approvals/{id}/decline", post(approvals::decline))
        // Wishlist
        .route("/wishlist/items", get(wishlist::list_items).post(wishlist::add_item))
        .route("/wishlist/items/{id}", put(wishlist::update_item).delete(wishlist::remove_item))
        .route("/wishlist/items/{id}/status", post(wishlist::set_status))
        .route("/wishlist/items/{id}/request-approval", post(wishlist::request_approval))
        .route("/wishlist/items/{id}/shelf", post(wishlist::move_to_shelf))
        .route("/wishlist/groups", get(wishlist::list_groups).post(wishlist::create_group))
        .route("/wishlist/groups/{id}", put(wishlist::update_group).delete(wishlist::delete_group))
        .route("/wishlist/groups/{id}/items", get(wishlist::group_items))
        .route(
            "/wishlist/groups/{id}/items/{item_id}",
            put(wishlist::add_item_to_group).delete(wishlist::remove_item_from_group),
        )
        // Shelf
        .route("/shelf/{child_id}", get(shelf::list_shelf))
        .route("/shelf/products/{id}", put(shelf::update_product).delete(shelf::remove_product))
        .route("/shelf/products/{id}/expiry", get(shelf::expiry_status))
        .route("/shelf/products/{id}/use", post(shelf::record_usage))
        // Routines
        .route("/routines/steps/{id}", delete(routines::remove_step))
        .route("/routines/{child_id}", get(routines::list_routine))
        .route("/routines/{child_id}/steps", post(routines::add_step))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/push-token", post(notifications::register_push_token))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        // Admin
        .route("/admin/feature-flags", get(admin::list_feature_flags))
        .route("/admin/feature-flags/{key}", put(admin::set_feature_flag))
        .route(
            "/admin/prompts/{key}/versions",
            get(admin::list_prompt_versions).post(admin::create_prompt_version),
        )
        .route(
            "/admin/prompts/{key}/versions/{version}/activate",
            post(admin::activate_prompt_version),
        )
        .route("/admin/audit-log", get(admin::list_audit_log))
        // AI
        .route("/ai/chat", post(ai::chat))
        .layer(axum::Extension(jwt_secret))
        .with_state(state)
}
