//! Gemini `generateContent` client.

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tally_core::{ChatTurn, Role};

use crate::config::LlmSection;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no Gemini API key configured; run: tally settings set-api-key <KEY>")]
    MissingApiKey,

    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gemini error: {status} {body}")]
    Http { status: u16, body: String },

    #[error("gemini returned no text ({reason})")]
    EmptyResponse { reason: String },
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(cfg: &LlmSection, api_key: Option<&str>) -> Result<Self, GenerationError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            api_key: api_key.to_string(),
        })
    }

    /// Send `message` after `history` and return the model's reply text.
    pub async fn generate(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, GenerationError> {
        let body = build_request(system, history, message, self.temperature);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(model = %self.model, history = history.len(), "gemini request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let out: GenerateResponse = resp.json().await?;
        extract_text(out)
    }
}

fn content(role: Option<Role>, text: &str) -> Content {
    Content {
        role: role.map(|r| match r {
            Role::User => "user".to_string(),
            Role::Model => "model".to_string(),
        }),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

fn build_request(system: &str, history: &[ChatTurn], message: &str, temperature: f32) -> GenerateRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|t| content(Some(t.role), &t.text))
        .collect();
    contents.push(content(Some(Role::User), message));

    GenerateRequest {
        system_instruction: content(None, system),
        contents,
        generation_config: GenerationConfig { temperature },
    }
}

/// Text parts of the first candidate, joined.
fn extract_text(resp: GenerateResponse) -> Result<String, GenerationError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::EmptyResponse {
            reason: format!("prompt blocked: {reason}"),
        });
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::EmptyResponse {
            reason: "no candidates".to_string(),
        })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse {
            reason: candidate
                .finish_reason
                .unwrap_or_else(|| "empty content".to_string()),
        });
    }
    Ok(text.to_string())
}
