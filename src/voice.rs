//! Voice synthesis via ElevenLabs text-to-speech
//!
//! Audio is strictly best-effort: the orchestration layer drops the audio on
//! any failure here and the turn proceeds text-only.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MODEL: &str = "eleven_turbo_v2_5";

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice request failed: {0}")]
    Network(String),
    #[error("voice synthesis rejected: HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("voice client setup failed: {0}")]
    Setup(String),
}

/// Common interface for text-to-speech providers
#[async_trait]
pub trait VoiceSynthesis: Send + Sync {
    /// Synthesize a reply into audio bytes (MP3).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

/// ElevenLabs TTS client
pub struct ElevenLabsVoice {
    client: Client,
    api_key: String,
    base_url: String,
    voice_id: String,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

impl ElevenLabsVoice {
    pub fn new(api_key: String, voice_id: String) -> Result<Self, VoiceError> {
        Self::with_base_url(api_key, voice_id, "https://api.elevenlabs.io".to_string())
    }

    pub fn with_base_url(
        api_key: String,
        voice_id: String,
        base_url: String,
    ) -> Result<Self, VoiceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VoiceError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            voice_id,
        })
    }
}

#[async_trait]
impl VoiceSynthesis for ElevenLabsVoice {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id);
        let request = SynthesisRequest {
            text,
            model_id: DEFAULT_MODEL,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
