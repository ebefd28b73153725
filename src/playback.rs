//! Audio "playback" for a server: synthesized clips are pushed to every
//! connected WebSocket client, and `play` resolves once the clip would have
//! finished playing on their side.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::sync::broadcast;
use tracing::debug;

use crate::narration::{AudioSink, TtsError};

/// One clip as delivered to clients.
#[derive(Clone, Debug)]
pub struct AudioFrame {
  pub audio_base64: String,
  pub sample_rate_hz: u32,
}

#[derive(Clone)]
pub struct BroadcastSink {
  tx: broadcast::Sender<AudioFrame>,
  sample_rate_hz: u32,
}

impl BroadcastSink {
  pub fn new(capacity: usize, sample_rate_hz: u32) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx, sample_rate_hz }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
    self.tx.subscribe()
  }
}

/// Length of a 16-bit mono PCM clip.
pub fn clip_duration(bytes: usize, sample_rate_hz: u32) -> Duration {
  if sample_rate_hz == 0 {
    return Duration::ZERO;
  }
  let samples = (bytes / 2) as u64;
  Duration::from_micros(samples * 1_000_000 / sample_rate_hz as u64)
}

#[async_trait]
impl AudioSink for BroadcastSink {
  async fn play(&self, audio: Vec<u8>) -> Result<(), TtsError> {
    let duration = clip_duration(audio.len(), self.sample_rate_hz);
    let frame = AudioFrame { audio_base64: STANDARD.encode(&audio), sample_rate_hz: self.sample_rate_hz };
    let listeners = self
      .tx
      .send(frame)
      .map_err(|_| TtsError::Playback("no connected listener".into()))?;
    debug!(target: "narration", listeners, ?duration, "Clip sent to clients");
    tokio::time::sleep(duration).await;
    Ok(())
  }
}
