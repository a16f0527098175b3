use std::env;
use std::time::Duration;

use crate::services::ai::AiProvider;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    pub fcm_api_key: Option<String>,
    // AI chat (optional)
    pub ai_provider: AiProvider,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_base_url: Option<String>,
    pub ai_rate_limit_per_minute: u64,
    // Caches and workflow timing
    pub feature_flag_ttl: Duration,
    pub prompt_ttl: Duration,
    pub approval_expiry_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let ai_provider: AiProvider = env::var("AI_PROVIDER")
            .unwrap_or_else(|_| "openai".into())
            .parse()?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            jwt_secret: required("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            fcm_api_key: env::var("FCM_API_KEY").ok().filter(|s| !s.is_empty()),
            ai_model: env::var("AI_MODEL")
                .unwrap_or_else(|_| ai_provider.default_model().into()),
            ai_provider,
            ai_api_key: env::var("AI_API_KEY").ok().filter(|s| !s.is_empty()),
            ai_base_url: env::var("AI_BASE_URL").ok().filter(|s| !s.is_empty()),
            ai_rate_limit_per_minute: env::var("AI_RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            feature_flag_ttl: Duration::from_secs(
                env::var("FEATURE_FLAG_TTL_SECS")
                    .unwrap_or_else(|_| "300".into())
                    .parse()?,
            ),
            prompt_ttl: Duration::from_secs(
                env::var("PROMPT_TTL_SECS")
                    .unwrap_or_else(|_| "120".into())
                    .parse()?,
            ),
            approval_expiry_days: env::var("APPROVAL_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
