use crate::error::AppError;

/// Checks a fixed-window rate limit stored in Redis.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns `RateLimited` if counter exceeds `max_attempts`
///
/// Redis being unreachable does not block the caller.
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), AppError> {
    let count: u64 = match redis::cmd("INCR").arg(key).query_async(redis).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!("rate limit check for '{key}' skipped: {e}");
            return Ok(());
        }
    };

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(redis)
            .await;
    }

    if count > max_attempts {
        return Err(AppError::RateLimited);
    }

    Ok(())
}

pub fn ai_chat_key(user_id: uuid::Uuid) -> String {
    format!("rate:ai_chat:{user_id}")
}
