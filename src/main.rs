use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skinshield_api::{
    config::Config,
    db::{self, Repositories},
    routes,
    services::{approval_expiry, metrics, ServiceSettings, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let repos = Repositories::postgres(pool.clone());
    let services = Services::new(&repos, ServiceSettings::from_config(&config));

    if config.fcm_api_key.is_some() {
        info!("FCM push notifications configured");
    } else {
        info!("FCM not configured, push notifications disabled");
    }
    if config.ai_api_key.is_none() {
        info!("AI provider not configured, /ai/chat will answer 503");
    }

    // Background tasks
    metrics::start(pool.clone());
    approval_expiry::start(services.approvals.clone(), config.approval_expiry_days);

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
        services,
    };

    // The mobile app does not send an Origin; browsers (admin console) must
    // come from APP_BASE_URL. Localhost is allowed for development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024));

    let addr = format!("{}:{}", config.host, config.port);
    info!("skinshield API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
