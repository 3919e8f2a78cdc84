//! Google Gemini / Imagen REST client.
//!
//! Thin HTTP wrapper for `models/{model}:generateContent` (text, optionally
//! schema-constrained JSON) and `models/{model}:predict` (Imagen). Pure
//! parsing in `parse_*` functions for testability.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use super::types::{CompletionRequest, GeneratedImage, ProviderError};

const TEMPERATURE: f32 = 0.9;
const IMAGE_MIME: &str = "image/jpeg";

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
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
        let body = build_generate_content_body(request);
        let path = format!("/models/{}:generateContent", self.text_model);
        let text = self.send_json(&path, &body).await?;
        parse_generate_content_response(&text)
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let body = PredictRequest {
            instances: [PredictInstance { prompt }],
            parameters: json!({ "sampleCount": 1, "outputOptions": { "mimeType": IMAGE_MIME } }),
        };
        let path = format!("/models/{}:predict", self.image_model);
        let text = self.send_json(&path, &body).await?;
        parse_predict_response(&text)
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
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
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: Value,
}

#[derive(Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

fn build_generate_content_body(request: &CompletionRequest<'_>) -> Value {
    let mut generation_config = json!({
        "maxOutputTokens": request.max_tokens,
        "temperature": TEMPERATURE,
    });
    if let Some(schema) = request.schema {
        generation_config["responseMimeType"] = json!("application/json");
        generation_config["responseSchema"] = schema.to_openapi_schema();
    }
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": generation_config,
    })
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_generate_content_response(json_text: &str) -> Result<String, ProviderError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| ProviderError::ApiParse(e.to_string()))?;

    let Some(candidate) = root
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        let reason = root
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
            .unwrap_or("no candidates");
        return Err(ProviderError::EmptyResponse(reason.to_string()));
    };

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .unwrap_or("empty text");
        return Err(ProviderError::EmptyResponse(reason.to_string()));
    }
    Ok(text)
}

pub(crate) fn parse_predict_response(json_text: &str) -> Result<GeneratedImage, ProviderError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| ProviderError::ApiParse(e.to_string()))?;
    let Some(prediction) = root
        .get("predictions")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(ProviderError::EmptyResponse("no predictions".to_string()));
    };
    let Some(base64) = prediction.get("bytesBase64Encoded").and_then(Value::as_str) else {
        let reason = prediction
            .get("raiFilteredReason")
            .and_then(Value::as_str)
            .unwrap_or("missing image bytes");
        return Err(ProviderError::EmptyResponse(reason.to_string()));
    };
    let mime_type = prediction
        .get("mimeType")
        .and_then(Value::as_str)
        .unwrap_or(IMAGE_MIME);
    Ok(GeneratedImage { mime_type: mime_type.to_string(), base64: base64.to_string() })
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
