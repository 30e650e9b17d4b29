//! Async dialogue client
//!
//! Model-agnostic HTTP client for the optional NPC dialogue service.
//! Supports both Anthropic and OpenAI-compatible chat APIs.

use crate::core::error::{Result, SimError};
use crate::llm::dialogue::{clean_reply, DialogueRequest, DialogueResponse};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You voice villagers in a small farming village. \
Answer with a single short line of dialogue and nothing else.";

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

pub struct DialogueClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

impl DialogueClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
        }
    }

    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    pub fn api_format(&self) -> &ApiFormat {
        &self.api_format
    }

    /// Create a client from environment variables
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to Anthropic API)
    /// Optional: LLM_MODEL (defaults to claude-3-haiku-20240307)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| SimError::DialogueError("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-3-haiku-20240307".into());

        Ok(Self::new(api_key, api_url, model))
    }

    /// Ask for one NPC line
    pub async fn reply(&self, request: &DialogueRequest) -> Result<DialogueResponse> {
        request.validate()?;
        let prompt = request.completion_prompt();

        let raw = match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(&prompt).await?,
            ApiFormat::OpenAI => self.complete_openai(&prompt).await?,
        };

        let reply = clean_reply(&raw);
        if reply.is_empty() {
            return Err(SimError::DialogueError("Empty reply".into()));
        }
        Ok(DialogueResponse { reply })
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: SYSTEM_PROMPT.into(),
            messages: vec![Message {
                role: "user".into(),
                content: prompt.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SimError::DialogueError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SimError::DialogueError(format!("API error: {}", error_text)));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| SimError::DialogueError(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| SimError::DialogueError("Empty response".into()))
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            stop: vec!["\n".into(), " Player:".into(), " NPC:".into()],
            messages: vec![
                Message {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                Message {
                    role: "user".into(),
                    content: prompt.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SimError::DialogueError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SimError::DialogueError(format!("API error: {}", error_text)));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| SimError::DialogueError(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| SimError::DialogueError("Empty response".into()))
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    stop: Vec<String>,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
