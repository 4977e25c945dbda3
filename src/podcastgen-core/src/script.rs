//! Dialogue script generation via an OpenAI-compatible chat API.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::PodcastError;
use crate::news::{NewsItem, format_news_digest};

/// Anything that can turn news into a two-speaker script.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate_script(&self, news: &[NewsItem]) -> Result<String, PodcastError>;
}

/// Script writer backed by a chat completion endpoint.
pub struct OpenAiScriptWriter {
    config: Config,
    api_key: String,
    max_retries: u32,
}

impl OpenAiScriptWriter {
    pub fn new(config: Config, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            max_retries: 3,
        }
    }

    /// Get a completion for a single user prompt.
    /// Includes retry logic with exponential backoff for resilience.
    async fn get_completion(&self, prompt: String) -> Result<String, PodcastError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PodcastError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(&self.api_key)
            .with_api_base(&self.config.models.script_api_base);

        let client = Client::with_config(config).with_http_client(http_client);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.models.script_model)
            .max_completion_tokens(self.config.models.script_max_tokens)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: prompt.into(),
                    name: None,
                },
            )])
            .build()?;

        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 2s, 4s
                let delay = std::time::Duration::from_secs(1 << attempt);
                tokio::time::sleep(delay).await;
            }

            match client.chat().create(request.clone()).await {
                Ok(response) => {
                    let content = response
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .unwrap_or_default();
                    return Ok(content);
                }
                Err(e) => {
                    warn!(
                        "Script request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map(PodcastError::from).unwrap_or_else(|| {
            PodcastError::ConfigError("Unknown API error after retries".to_string())
        }))
    }
}

#[async_trait]
impl ScriptGenerator for OpenAiScriptWriter {
    async fn generate_script(&self, news: &[NewsItem]) -> Result<String, PodcastError> {
        info!("Generating podcast script from {} news items", news.len());
        let prompt = self.config.script_prompt(&format_news_digest(news));
        let script = sanitize_script(&self.get_completion(prompt).await?);

        if script.is_empty() {
            return Err(PodcastError::ConfigError(
                "Script model returned an empty response".to_string(),
            ));
        }
        Ok(script)
    }
}

/// Strip reasoning tags and markdown from a generated script while keeping
/// one dialogue line per speaker turn.
pub fn sanitize_script(response: &str) -> String {
    let tags_to_strip = ["thinking", "think", "reflection", "reasoning", "thought", "scratchpad"];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Code fences and emphasis markers
    result = result.replace("```", "").replace(['*', '#'], "");

    if let Ok(ws_re) = regex::Regex::new(r"[ \t]+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
