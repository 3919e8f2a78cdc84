//! OpenAI-compatible API client.
//!
//! Text goes through `/chat/completions` (with a `json_schema` response
//! format when structured output is requested); images through
//! `/images/generations` with `b64_json` output.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use super::types::{CompletionRequest, GeneratedImage, ProviderError};

const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_MIME: &str = "image/png";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(
        api_key: String,
        base_url: String,
        text_model: String,
        image_model: String,
        connect_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url, text_model, image_model })
    }

    pub async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderError> {
        let body = build_chat_completions_body(&self.text_model, request);
        let text = self.send_json("/chat/completions", &body).await?;
        parse_chat_completions_response(&text)
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let body = ImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            response_format: "b64_json",
        };
        let text = self.send_json("/images/generations", &body).await?;
        parse_image_response(&text)
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(ProviderError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

fn build_chat_completions_body(model: &str, request: &CompletionRequest<'_>) -> Value {
    let mut body = json!({
        "model": model,
        "max_tokens": request.max_tokens,
        "messages": [{ "role": "user", "content": request.prompt }],
    });
    if let Some(schema) = request.schema {
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": { "name": schema.name, "strict": true, "schema": schema.to_json_schema() },
        });
    }
    body
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<String, ProviderError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| ProviderError::ApiParse(e.to_string()))?;
    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(ProviderError::ApiParse("chat_completions: missing choices[0]".to_string()));
    };

    if let Some(refusal) = choice.pointer("/message/refusal").and_then(Value::as_str) {
        return Err(ProviderError::EmptyResponse(format!("refused: {refusal}")));
    }

    match choice.pointer("/message/content").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => {
            let reason = choice
                .get("finish_reason")
                .and_then(Value::as_str)
                .unwrap_or("empty content");
            Err(ProviderError::EmptyResponse(reason.to_string()))
        }
    }
}

pub(crate) fn parse_image_response(json_text: &str) -> Result<GeneratedImage, ProviderError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| ProviderError::ApiParse(e.to_string()))?;
    let Some(base64) = root
        .get("data")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|item| item.get("b64_json"))
        .and_then(Value::as_str)
    else {
        return Err(ProviderError::EmptyResponse("images: missing data[0].b64_json".to_string()));
    };
    Ok(GeneratedImage { mime_type: IMAGE_MIME.to_string(), base64: base64.to_string() })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
