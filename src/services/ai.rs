use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    services::{
        feature_flags::{FeatureFlagService, AI_ASSISTANT},
        metrics::AI_REQUESTS_COUNTER,
        prompts::PromptLoader,
    },
};

pub const SYSTEM_PROMPT_KEY: &str = "skincare_assistant";
const MAX_MESSAGES: usize = 20;
const MAX_MESSAGE_CHARS: usize = 4000;

/// Chat completion backends. Both speak the OpenAI wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Mistral,
}

impl AiProvider {
    pub fn label(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Mistral => "mistral",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-4o-mini",
            AiProvider::Mistral => "mistral-small-latest",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "https://api.openai.com",
            AiProvider::Mistral => "https://api.mistral.ai",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AiProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "mistral" => Ok(AiProvider::Mistral),
            other => Err(anyhow::anyhow!("Unknown AI provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub model: String,
    pub prompt_version: i32,
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

pub struct AiService {
    client: Client,
    settings: AiSettings,
    flags: Arc<FeatureFlagService>,
    prompts: Arc<PromptLoader>,
}

impl AiService {
    pub fn new(settings: AiSettings, flags: Arc<FeatureFlagService>, prompts: Arc<PromptLoader>) -> Self {
        Self {
            client: Client::new(),
            settings,
            flags,
            prompts,
        }
    }

    pub fn provider(&self) -> AiProvider {
        self.settings.provider
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> AppResult<ChatReply> {
        if !self.flags.is_enabled(AI_ASSISTANT).await? {
            return Err(AppError::Unavailable("AI assistant"));
        }
        let api_key = match &self.settings.api_key {
            Some(k) => k,
            None => {
                tracing::debug!("AI provider not configured, rejecting chat");
                return Err(AppError::Unavailable("AI assistant"));
            }
        };
        validate_messages(messages)?;

        let prompt = self.prompts.get_prompt(SYSTEM_PROMPT_KEY).await?;
        let model = prompt.model.clone().unwrap_or_else(|| self.settings.model.clone());
        let payload = build_request(&model, &prompt.content, messages);

        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(self.settings.provider.default_base_url())
            .trim_end_matches('/');
        let provider = self.settings.provider.label();

        let response = self
            .client
            .post(format!("{base}/v1/chat/completions"))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                AI_REQUESTS_COUNTER.with_label_values(&[provider, "error"]).inc();
                AppError::Upstream(format!("{provider} unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("{provider} error {status}: {text}");
            AI_REQUESTS_COUNTER.with_label_values(&[provider, "error"]).inc();
            return Err(AppError::Upstream(format!("{provider} returned {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid {provider} response: {e}")))?;
        let reply = extract_content(&body).ok_or_else(|| {
            AI_REQUESTS_COUNTER.with_label_values(&[provider, "error"]).inc();
            AppError::Upstream(format!("{provider} returned no completion"))
        })?;

        AI_REQUESTS_COUNTER.with_label_values(&[provider, "ok"]).inc();
        Ok(ChatReply {
            reply,
            model,
            prompt_version: prompt.version,
        })
    }
}

fn validate_messages(messages: &[ChatMessage]) -> AppResult<()> {
    if messages.is_empty() {
        return Err(AppError::validation("at least one message is required"));
    }
    if messages.len() > MAX_MESSAGES {
        return Err(AppError::validation(format!(
            "at most {MAX_MESSAGES} messages per request"
        )));
    }
    for m in messages {
        if m.role != "user" && m.role != "assistant" {
            return Err(AppError::validation("message role must be user or assistant"));
        }
        if m.content.trim().is_empty() || m.content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::validation(format!(
                "message content must be 1 to {MAX_MESSAGE_CHARS} characters"
            )));
        }
    }
    Ok(())
}

/// Chat completion body with the system prompt in front of the conversation.
pub fn build_request(model: &str, system_prompt: &str, messages: &[ChatMessage]) -> Value {
    let mut all = Vec::with_capacity(messages.len() + 1);
    all.push(json!({ "role": "system", "content": system_prompt }));
    all.extend(
        messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content })),
    );
    json!({
        "model": model,
        "messages": all,
        "temperature": 0.3,
    })
}

/// First choice's message text, if any.
pub fn extract_content(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
