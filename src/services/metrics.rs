use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Gauge, GaugeVec,
};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref APPROVAL_REQUESTS_COUNTER: CounterVec = register_counter_vec!(
        "api_approval_requests_total",
        "Product review requests by source",
        &["source"]
    ).unwrap();

    pub static ref APPROVAL_DECISIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_approval_decisions_total",
        "Approval status changes by resulting status",
        &["status"]
    ).unwrap();

    pub static ref WISHLIST_TRANSITIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_wishlist_transitions_total",
        "Wishlist status changes by target status",
        &["status"]
    ).unwrap();

    pub static ref CACHE_LOOKUPS_COUNTER: CounterVec = register_counter_vec!(
        "api_config_cache_lookups_total",
        "Feature flag / prompt cache lookups",
        &["cache", "result"]
    ).unwrap();

    pub static ref AI_REQUESTS_COUNTER: CounterVec = register_counter_vec!(
        "api_ai_requests_total",
        "Chat completion calls by provider and outcome",
        &["provider", "status"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref PENDING_APPROVALS_GAUGE: Gauge = register_gauge!(
        "skincare_pending_approvals_total",
        "Approvals waiting for a parent decision"
    ).unwrap();

    pub static ref WISHLIST_ITEMS_GAUGE: GaugeVec = register_gauge_vec!(
        "skincare_wishlist_items_total",
        "Wishlist items by status",
        &["status"]
    ).unwrap();

    pub static ref CHILDREN_GAUGE: Gauge = register_gauge!(
        "skincare_children_total",
        "Child profiles"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        // Initial collection on startup
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM product_approvals WHERE status = 'pending'",
    )
    .fetch_one(pool)
    .await?;
    PENDING_APPROVALS_GAUGE.set(pending as f64);

    let by_status: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*)::BIGINT FROM wishlist_items GROUP BY status",
    )
    .fetch_all(pool)
    .await
    .unwrap_or_default();
    for (status, count) in by_status {
        WISHLIST_ITEMS_GAUGE.with_label_values(&[&status]).set(count as f64);
    }

    let children: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM children")
        .fetch_one(pool)
        .await
        .unwrap_or(0);
    CHILDREN_GAUGE.set(children as f64);

    info!("Metrics: collected ({} pending approvals)", pending);
    Ok(())
}
