use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    cache::TtlCell,
    db::{FeatureFlagRepository, Repositories},
    error::{AppError, AppResult},
    models::feature_flag::FeatureFlag,
    services::metrics::CACHE_LOOKUPS_COUNTER,
};

pub const AI_ASSISTANT: &str = "ai_assistant";

/// Feature toggles read through a TTL cache. Writes invalidate the cache;
/// two readers racing a refresh may both query, which is harmless.
pub struct FeatureFlagService {
    repo: Arc<dyn FeatureFlagRepository>,
    cache: TtlCell<HashMap<String, bool>>,
}

impl FeatureFlagService {
    pub fn new(repos: &Repositories, ttl: Duration) -> Self {
        Self {
            repo: repos.feature_flags.clone(),
            cache: TtlCell::new(ttl),
        }
    }

    pub async fn get_feature_flags(&self) -> AppResult<HashMap<String, bool>> {
        if let Some(flags) = self.cache.get().await {
            CACHE_LOOKUPS_COUNTER.with_label_values(&["feature_flags", "hit"]).inc();
            return Ok(flags);
        }
        CACHE_LOOKUPS_COUNTER.with_label_values(&["feature_flags", "miss"]).inc();

        let flags: HashMap<String, bool> = self
            .repo
            .list_flags()
            .await?
            .into_iter()
            .map(|f| (f.key, f.enabled))
            .collect();
        self.cache.put(flags.clone()).await;
        Ok(flags)
    }

    /// Unknown keys are off.
    pub async fn is_enabled(&self, key: &str) -> AppResult<bool> {
        Ok(self.get_feature_flags().await?.get(key).copied().unwrap_or(false))
    }

    /// Full rows for the admin screen, always read from the database.
    pub async fn list(&self) -> AppResult<Vec<FeatureFlag>> {
        Ok(self.repo.list_flags().await?)
    }

    pub async fn set_flag(
        &self,
        key: &str,
        enabled: bool,
        description: Option<&str>,
        updated_by: Option<Uuid>,
    ) -> AppResult<FeatureFlag> {
        if !is_valid_key(key) {
            return Err(AppError::validation(
                "flag keys are lowercase letters, digits and underscores",
            ));
        }
        let flag = self.repo.set_flag(key, enabled, description, updated_by).await?;
        self.cache.invalidate().await;
        tracing::info!(key, enabled, "feature flag updated");
        Ok(flag)
    }
}

pub(crate) fn is_valid_key(key: &str) -> bool {
    (1..=64).contains(&key.len())
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
