use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Extension, Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use skinshield_api::{
    error::AppError,
    middleware::{
        admin::AdminUser,
        auth::{issue_access_token, JwtSecret},
    },
    models::{auth::AuthenticatedUser, user::UserRole},
    routes::metrics::metrics_handler,
};

const SECRET: &str = "test-secret";

async fn whoami(user: AuthenticatedUser) -> String {
    user.role.to_string()
}

async fn admin_only(AdminUser(user): AdminUser) -> String {
    user.user_id.to_string()
}

async fn always_conflict() -> Result<String, AppError> {
    Err(AppError::Conflict("Approval was already reviewed".into()))
}

fn app() -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .route("/admin", get(admin_only))
        .route("/conflict", get(always_conflict))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(JwtSecret(SECRET.into())))
}

fn bearer(role: UserRole) -> String {
    let token = issue_access_token(Uuid::new_v4(), role, SECRET, 600).unwrap();
    format!("Bearer {token}")
}

async fn get_path(path: &str, auth: Option<String>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().uri(path);
    if let Some(auth) = auth {
        req = req.header("Authorization", auth);
    }
    let resp = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let (status, _) = get_path("/whoami", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_path("/whoami", Some("Bearer not-a-jwt".into())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = issue_access_token(Uuid::new_v4(), UserRole::Parent, "other", 600).unwrap();
    let (status, _) = get_path("/whoami", Some(format!("Bearer {foreign}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_token_carries_the_role() {
    let (status, body) = get_path("/whoami", Some(bearer(UserRole::Child))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"child");
}

#[tokio::test]
async fn admin_routes_reject_parents() {
    let (status, _) = get_path("/admin", Some(bearer(UserRole::Parent))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get_path("/admin", Some(bearer(UserRole::Admin))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn errors_render_as_json() {
    let (status, body) = get_path("/conflict", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Approval was already reviewed");
}

#[tokio::test]
async fn metrics_endpoint_is_public() {
    skinshield_api::services::metrics::APPROVAL_DECISIONS_COUNTER
        .with_label_values(&["approved"])
        .inc();
    let (status, body) = get_path("/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("api_approval_decisions_total"));
}
