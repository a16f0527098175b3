use std::sync::Arc;

use tracing::{info, warn};

use crate::services::approvals::ApprovalService;

const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Spawn a background task that wakes up every hour and expires approvals
/// nobody decided on within `max_age_days`.
pub fn start(approvals: Arc<ApprovalService>, max_age_days: i64) {
    let max_age = chrono::Duration::days(max_age_days);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(SWEEP_INTERVAL_SECS)).await;

            match approvals.expire_stale(max_age).await {
                Ok(0) => {}
                Ok(n) => info!("Approval expiry: {} approval(s) expired", n),
                Err(e) => warn!("Approval expiry sweep failed: {}", e),
            }
        }
    });
}
