use crate::providers::{ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse, Usage};
use async_trait::async_trait;
use evorelay_common::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat-completions provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self::with_client(Client::new(), api_key, base_url)
    }

    /// Share an existing HTTP client (and its connection pool and timeouts).
    pub fn with_client(client: Client, api_key: String, base_url: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let openai_request = convert_request(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "OpenAI API error: {status} - {}",
                error_text.trim()
            )));
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("Failed to parse OpenAI response: {e}")))?;

        debug!(
            model = %openai_response.model,
            choices = openai_response.choices.len(),
            "openai completion received"
        );
        Ok(convert_response(openai_response))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

fn convert_request(request: &LlmRequest) -> OpenAiRequest<'_> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    if let Some(system_prompt) = &request.system {
        messages.push(OpenAiMessage {
            role: ChatRole::System,
            content: system_prompt,
        });
    }
    messages.extend(request.messages.iter().map(|msg: &ChatMessage| OpenAiMessage {
        role: msg.role,
        content: &msg.content,
    }));

    OpenAiRequest {
        model: &request.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

fn convert_response(response: OpenAiResponse) -> LlmResponse {
    LlmResponse {
        choices: response
            .choices
            .into_iter()
            .map(|choice| choice.message.content.unwrap_or_default())
            .collect(),
        model: response.model,
        usage: response.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    }
}

// Request Types
#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

// Response Types
#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
