use super::shapes::extract_text;
use super::{CompletionError, CompletionGateway};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Tool identifier tried first for web search.
const SEARCH_TOOL_PRIMARY: &str = "web_search_preview";
/// Tool identifier retried once when the primary one is rejected.
const SEARCH_TOOL_FALLBACK: &str = "web_search";

#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub chat_timeout: Duration,
    pub search_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("chat_timeout", &self.chat_timeout)
            .field("search_timeout", &self.search_timeout)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-5.1".to_string(),
            base_url: "https://api.cometapi.com".to_string(),
            chat_timeout: Duration::from_secs(60),
            search_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct SearchTool<'a> {
    r#type: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    model: &'a str,
    input: &'a str,
    tools: Vec<SearchTool<'a>>,
}

/// Client for an OpenAI-compatible completion proxy (CometAPI by default).
#[derive(Clone)]
pub struct CometClient {
    client: Client,
    config: GatewayConfig,
    chat_url: String,
    responses_url: String,
}

impl CometClient {
    pub fn new(config: GatewayConfig) -> Result<Self, CompletionError> {
        let client = Client::builder().build()?;
        let root = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            chat_url: format!("{root}/v1/chat/completions"),
            responses_url: format!("{root}/v1/responses"),
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<Value, CompletionError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::status(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(CompletionError::MalformedBody)
    }

    async fn search_with_tool(&self, prompt: &str, tool: &str) -> Result<Value, CompletionError> {
        let request = SearchRequest {
            model: &self.config.model,
            input: prompt,
            tools: vec![SearchTool { r#type: tool }],
        };
        self.post_json(&self.responses_url, &request, self.config.search_timeout)
            .await
    }
}

#[async_trait]
impl CompletionGateway for CometClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };
        log::debug!(
            "POST {} (model={}, prompt_chars={})",
            self.chat_url,
            self.config.model,
            user_prompt.chars().count()
        );

        let body = self
            .post_json(&self.chat_url, &request, self.config.chat_timeout)
            .await?;
        let (shape, text) = extract_text(&body)?;
        log::debug!("Completion parsed as {:?} ({} chars)", shape, text.chars().count());
        Ok(text)
    }

    async fn search(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = match self.search_with_tool(prompt, SEARCH_TOOL_PRIMARY).await {
            Err(e) if matches!(e.http_status(), Some(400) | Some(422)) => {
                log::warn!(
                    "Search tool '{}' rejected ({}), retrying with '{}'",
                    SEARCH_TOOL_PRIMARY,
                    e,
                    SEARCH_TOOL_FALLBACK
                );
                self.search_with_tool(prompt, SEARCH_TOOL_FALLBACK).await?
            }
            other => other?,
        };
        Ok(extract_text(&body)?.1)
    }
}
