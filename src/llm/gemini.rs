//! Google Gemini provider implementation

use super::types::{Citation, GeneratedReply, GenerationRequest, Turn, TurnRole};
use super::{TextGenError, TextGenService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini models
#[derive(Debug, Clone, Copy)]
pub enum GeminiModel {
    Flash,
    Pro,
}

impl GeminiModel {
    pub fn api_name(self) -> &'static str {
        match self {
            GeminiModel::Flash => "gemini-2.5-flash",
            GeminiModel::Pro => "gemini-2.5-pro",
        }
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    base_url: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(api_key: String, model: GeminiModel) -> Result<Self, TextGenError> {
        let base_url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model.api_name()
        );
        Self::with_base_url(api_key, model, base_url)
    }

    /// Point the client at a custom endpoint (tests, gateways).
    pub fn with_base_url(
        api_key: String,
        model: GeminiModel,
        base_url: String,
    ) -> Result<Self, TextGenError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TextGenError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model_id: model.api_name().to_string(),
        })
    }

    fn translate_request(request: &GenerationRequest) -> GeminiRequest {
        let system_instruction = if request.system_guidance.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_guidance.clone(),
                }],
            })
        };

        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .filter(|turn| !turn.text.is_empty())
            .map(GeminiContent::from_turn)
            .collect();

        contents.push(GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: request.user_message.clone(),
            }],
        });

        let tools = if request.grounding {
            Some(vec![GeminiTool {
                google_search: serde_json::Map::new(),
            }])
        } else {
            None
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: request.max_output_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: Some(max),
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<GeneratedReply, TextGenError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| TextGenError::unknown("No candidates in response"))?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        let citations = candidate
            .grounding_metadata
            .map(|meta| {
                meta.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .map(|web| Citation {
                        uri: web.uri,
                        title: web.title.unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(GeneratedReply { text, citations })
    }
}

#[async_trait]
impl TextGenService for GeminiService {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedReply, TextGenError> {
        let gemini_request = Self::translate_request(request);
        let url = format!("{}?key={}", self.base_url, self.api_key);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TextGenError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    TextGenError::network(format!("Connection failed: {e}"))
                } else {
                    TextGenError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TextGenError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                let message = error_resp.error.message;
                return Err(match status.as_u16() {
                    400 => TextGenError::invalid_request(format!("Invalid request: {message}")),
                    401 | 403 => TextGenError::auth(format!("Authentication failed: {message}")),
                    429 => TextGenError::rate_limit(format!("Rate limit exceeded: {message}")),
                    500..=599 => TextGenError::server_error(format!("Server error: {message}")),
                    _ => TextGenError::unknown(format!("HTTP {status}: {message}")),
                });
            }
            return Err(TextGenError::unknown(format!("HTTP {status} error: {body}")));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| TextGenError::unknown(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn from_turn(turn: &Turn) -> Self {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart {
                text: turn.text.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    /// `{"google_search": {}}` enables search grounding.
    #[serde(rename = "google_search")]
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: GeminiContent,
    #[serde(default)]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    #[serde(default)]
    web: Option<GeminiWebSource>,
}

#[derive(Debug, Deserialize)]
struct GeminiWebSource {
    uri: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_includes_guidance_and_history() {
        let request = GenerationRequest::new(
            "Ask for their name",
            vec![Turn::model("Welcome!"), Turn::user("hi")],
            "Alex",
        );

        let translated = GeminiService::translate_request(&request);

        assert!(translated.system_instruction.is_some());
        // Two history turns plus the current user message.
        assert_eq!(translated.contents.len(), 3);
        assert_eq!(translated.contents[0].role.as_deref(), Some("model"));
        assert_eq!(translated.contents[2].parts[0].text, "Alex");
        assert!(translated.tools.is_none());
    }

    #[test]
    fn translate_adds_search_tool_when_grounded() {
        let request = GenerationRequest::new("guidance", vec![], "tell me about acme.com")
            .with_grounding();

        let translated = GeminiService::translate_request(&request);
        assert!(translated.tools.is_some());
    }

    #[test]
    fn normalize_extracts_text_and_citations() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Acme makes anvils."}]
                },
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://acme.com", "title": "Acme"}},
                        {"web": {"uri": "https://example.com"}},
                        {}
                    ]
                }
            }]
        });

        let resp: GeminiResponse = serde_json::from_value(raw).unwrap();
        let reply = GeminiService::normalize_response(resp).unwrap();

        assert_eq!(reply.text, "Acme makes anvils.");
        assert_eq!(reply.citations.len(), 2);
        assert_eq!(reply.citations[0].uri, "https://acme.com");
        assert_eq!(reply.citations[0].title, "Acme");
        assert_eq!(reply.citations[1].title, "");
    }

    #[test]
    fn normalize_fails_without_candidates() {
        let resp: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(GeminiService::normalize_response(resp).is_err());
    }
}
