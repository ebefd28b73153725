//! Application state: persisted lists, the narration queue, the audio fan-out and configuration.
//!
//! This module owns:
//!   - the history/leaderboard store (JSON files under DATA_DIR)
//!   - the process-wide narration queue (one worker, rate limited)
//!   - the broadcast sink that carries synthesized audio to WebSocket clients
//!   - the loaded `AppConfig`

use std::{path::PathBuf, sync::Arc, time::Duration};

use tracing::{info, instrument, warn};

use crate::config::{load_app_config_from_env, AppConfig};
use crate::gemini::GeminiTts;
use crate::narration::{NarrationQueue, SpeechSynthesizer, TtsError};
use crate::playback::BroadcastSink;
use crate::store::Store;

// Clips buffered per client before a slow receiver starts lagging.
const AUDIO_CHANNEL_CAPACITY: usize = 16;

pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub narration: NarrationQueue,
    pub audio: BroadcastSink,
}

impl AppState {
    /// Build state from env: load config, open the store, start the narration worker.
    #[instrument(level = "info", skip_all)]
    pub async fn new() -> Result<Self, TtsError> {
        let config = load_app_config_from_env();
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let tts = GeminiTts::from_env(&config.narration.voice)?;
        if tts.has_credential() {
            info!(target: "tinhnhanh_backend", base_url = %tts.base_url, model = %tts.model, voice = %tts.voice, "Gemini speech enabled.");
        } else {
            warn!(target: "tinhnhanh_backend", "No GEMINI_API_KEY/API_KEY set; narration requests will be silent.");
        }

        let store = Store::open(&data_dir).await;
        info!(target: "tinhnhanh_backend", data_dir = %data_dir.display(), quiz_length = config.quiz.length, "Store ready");

        Ok(Self::from_parts(config, store, Arc::new(tts)))
    }

    /// Assemble state around any synthesizer. Must run inside a tokio runtime.
    pub fn from_parts(config: AppConfig, store: Store, synth: Arc<dyn SpeechSynthesizer>) -> Self {
        let audio = BroadcastSink::new(AUDIO_CHANNEL_CAPACITY, config.narration.sample_rate_hz);
        let narration = NarrationQueue::spawn(
            synth,
            Arc::new(audio.clone()),
            Duration::from_millis(config.narration.min_spacing_ms),
            config.narration.prompt_template.clone(),
        );
        Self { config, store, narration, audio }
    }
}
