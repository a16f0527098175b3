use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use crate::{db::NotificationRepository, models::notification::Notification};

/// Delivers a user-facing message. Callers treat failures as non-fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
    ) -> anyhow::Result<Notification>;
}

pub struct NotificationService {
    client: Client,
    fcm_api_key: Option<String>,
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, fcm_api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            fcm_api_key,
            repo,
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Notification>> {
        self.repo.list_for_user(user_id, 100).await
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        self.repo.mark_read(id, user_id).await
    }

    pub async fn register_push_token(
        &self,
        user_id: Uuid,
        platform: &str,
        token: &str,
    ) -> anyhow::Result<()> {
        self.repo.register_push_token(user_id, platform, token).await
    }

    async fn send_fcm(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
    ) -> anyhow::Result<()> {
        let api_key = match &self.fcm_api_key {
            Some(k) => k,
            None => {
                tracing::debug!("FCM not configured, skipping push notification");
                return Ok(());
            }
        };

        let mut payload = json!({
            "to": token,
            "notification": {
                "title": title,
                "body": body,
            }
        });

        if let Some(d) = data {
            payload["data"] = d;
        }

        let response = self
            .client
            .post("https://fcm.googleapis.com/fcm/send")
            .header("Authorization", format!("key={}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("FCM error {}: {}", status, text);
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for NotificationService {
    /// Store an in-app notification, then push it to the user's devices.
    /// Push failures are logged and do not fail the call.
    async fn notify_user(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
    ) -> anyhow::Result<Notification> {
        let notification = self.repo.insert(user_id, title, body, data.as_ref()).await?;

        let tokens = self.repo.push_tokens(user_id).await?;
        for (platform, token) in tokens {
            match platform.as_str() {
                // iOS devices are registered through FCM as well
                "android" | "ios" => {
                    if let Err(e) = self.send_fcm(&token, title, body, data.clone()).await {
                        tracing::warn!("push to {platform} device failed: {e}");
                    }
                }
                _ => {}
            }
        }
        Ok(notification)
    }
}
