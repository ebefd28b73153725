//! Minimal Gemini text-to-speech client.
//!
//! We only call `models/{model}:generateContent` with the AUDIO response
//! modality and read back the base64 PCM payload.
//! Calls are instrumented and log model name, latency and payload size (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::narration::{SpeechSynthesizer, TtsError};

#[derive(Clone)]
pub struct GeminiTts {
  pub client: reqwest::Client,
  api_key: Option<String>,
  pub base_url: String,
  pub model: String,
  pub voice: String,
}

impl GeminiTts {
  /// Build the client from GEMINI_API_KEY (or API_KEY). Without a key the client
  /// still exists but every call fails with `MissingCredential`.
  pub fn from_env(voice: &str) -> Result<Self, TtsError> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty());
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_TTS_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| TtsError::Transport(e.to_string()))?;

    Ok(Self { client, api_key, base_url, model, voice: voice.to_string() })
  }

  pub fn has_credential(&self) -> bool {
    self.api_key.is_some()
  }
}

#[async_trait]
impl SpeechSynthesizer for GeminiTts {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, TtsError> {
    let api_key = self.api_key.as_deref().ok_or(TtsError::MissingCredential)?;
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateRequest::speech(prompt, &self.voice);

    let start = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "tinhnhanh-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", api_key)
      .json(&req)
      .send()
      .await
      .map_err(|e| TtsError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or(body);
      return Err(TtsError::Api { status, message });
    }

    let body: GenerateResponse = res.json().await.map_err(|e| TtsError::Transport(e.to_string()))?;
    let audio = decode_audio(&body)?;
    info!(elapsed = ?start.elapsed(), bytes = audio.len(), "Gemini speech received");
    Ok(audio)
  }
}

/// Pull the first inline audio part out of a response and decode it.
fn decode_audio(body: &GenerateResponse) -> Result<Vec<u8>, TtsError> {
  let data = body
    .candidates
    .first()
    .and_then(|c| c.content.as_ref())
    .and_then(|c| c.parts.first())
    .and_then(|p| p.inline_data.as_ref())
    .map(|d| d.data.as_str())
    .filter(|d| !d.is_empty())
    .ok_or(TtsError::EmptyAudio)?;
  STANDARD.decode(data).map_err(|e| TtsError::Decode(e.to_string()))
}

// --- Request DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}

impl GenerateRequest {
  fn speech(text: &str, voice: &str) -> Self {
    Self {
      contents: vec![Content { parts: vec![TextPart { text: text.to_string() }] }],
      generation_config: GenerationConfig {
        response_modalities: vec!["AUDIO".into()],
        speech_config: SpeechConfig {
          voice_config: VoiceConfig { prebuilt_voice_config: PrebuiltVoice { voice_name: voice.to_string() } },
        },
      },
    }
  }
}

#[derive(Serialize)]
struct Content { parts: Vec<TextPart> }
#[derive(Serialize)]
struct TextPart { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig { response_modalities: Vec<String>, speech_config: SpeechConfig }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig { voice_config: VoiceConfig }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig { prebuilt_voice_config: PrebuiltVoice }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice { voice_name: String }

// --- Response DTOs ---

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)] candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
  #[serde(default)] content: Option<CandidateContent>,
}
#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)] parts: Vec<ResponsePart>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
  #[serde(default)] inline_data: Option<InlineData>,
}
#[derive(Deserialize)]
struct InlineData { data: String }

/// Try to extract a clean error message from a Google API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn request_shape() {
    let v = serde_json::to_value(GenerateRequest::speech("Say: hi", "Zephyr")).unwrap();
    assert_eq!(v["contents"][0]["parts"][0]["text"], "Say: hi");
    assert_eq!(v["generationConfig"]["responseModalities"][0], "AUDIO");
    assert_eq!(
      v["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
      "Zephyr"
    );
  }

  #[test]
  fn decodes_inline_audio() {
    let body: GenerateResponse = serde_json::from_str(
      r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"audio/L16;rate=24000","data":"AAEC"}}]}}]}"#,
    )
    .unwrap();
    assert_eq!(decode_audio(&body).unwrap(), vec![0u8, 1, 2]);
  }

  #[test]
  fn missing_audio_is_empty_error() {
    let body: GenerateResponse = serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"no"}]}}]}"#).unwrap();
    assert!(matches!(decode_audio(&body), Err(TtsError::EmptyAudio)));
    let body: GenerateResponse = serde_json::from_str("{}").unwrap();
    assert!(matches!(decode_audio(&body), Err(TtsError::EmptyAudio)));
  }

  #[test]
  fn bad_base64_is_decode_error() {
    let body: GenerateResponse =
      serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"!!"}}]}}]}"#).unwrap();
    assert!(matches!(decode_audio(&body), Err(TtsError::Decode(_))));
  }

  #[test]
  fn api_error_message() {
    let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
    assert_eq!(extract_api_error(body).as_deref(), Some("Quota exceeded"));
    assert_eq!(extract_api_error("not json"), None);
  }

  #[tokio::test]
  async fn missing_key_fails_without_network() {
    let tts = GeminiTts {
      client: reqwest::Client::new(),
      api_key: None,
      base_url: "http://127.0.0.1:9".into(),
      model: "m".into(),
      voice: "Zephyr".into(),
    };
    assert!(!tts.has_credential());
    assert!(matches!(tts.synthesize("hi").await, Err(TtsError::MissingCredential)));
  }
}
