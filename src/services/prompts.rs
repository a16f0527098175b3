use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    cache::TtlCache,
    db::{PromptRepository, Repositories},
    error::{AppError, AppResult},
    models::prompt::PromptVersion,
    services::{feature_flags::is_valid_key, metrics::CACHE_LOOKUPS_COUNTER},
};

/// Versioned system prompts, cached per key.
pub struct PromptLoader {
    repo: Arc<dyn PromptRepository>,
    cache: TtlCache<String, PromptVersion>,
}

impl PromptLoader {
    pub fn new(repos: &Repositories, ttl: Duration) -> Self {
        Self {
            repo: repos.prompts.clone(),
            cache: TtlCache::new(ttl),
        }
    }

    /// Active version for `key`. Misses are not cached so a freshly
    /// activated prompt shows up right away.
    pub async fn get_prompt(&self, key: &str) -> AppResult<PromptVersion> {
        let cache_key = key.to_string();
        if let Some(prompt) = self.cache.get(&cache_key).await {
            CACHE_LOOKUPS_COUNTER.with_label_values(&["prompts", "hit"]).inc();
            return Ok(prompt);
        }
        CACHE_LOOKUPS_COUNTER.with_label_values(&["prompts", "miss"]).inc();

        let prompt = self
            .repo
            .active_version(key)
            .await?
            .ok_or(AppError::NotFound("Prompt"))?;
        self.cache.put(cache_key, prompt.clone()).await;
        Ok(prompt)
    }

    pub async fn list_versions(&self, key: &str) -> AppResult<Vec<PromptVersion>> {
        Ok(self.repo.list_versions(key).await?)
    }

    pub async fn create_version(
        &self,
        key: &str,
        content: &str,
        model: Option<&str>,
        created_by: Option<Uuid>,
        activate: bool,
    ) -> AppResult<PromptVersion> {
        if !is_valid_key(key) {
            return Err(AppError::validation(
                "prompt keys are lowercase letters, digits and underscores",
            ));
        }
        if content.trim().is_empty() {
            return Err(AppError::validation("prompt content is required"));
        }

        let created = self.repo.create_version(key, content, model, created_by).await?;
        tracing::info!(key, version = created.version, "prompt version created");
        if activate {
            return self.activate_version(key, created.version).await;
        }
        Ok(created)
    }

    pub async fn activate_version(&self, key: &str, version: i32) -> AppResult<PromptVersion> {
        let prompt = self
            .repo
            .activate_version(key, version)
            .await?
            .ok_or(AppError::NotFound("Prompt version"))?;
        self.cache.invalidate(&key.to_string()).await;
        tracing::info!(key, version, "prompt version activated");
        Ok(prompt)
    }
}
