//! Sequential, rate-limited narration.
//!
//! All `speak` requests go into one FIFO drained by a single worker task, so at
//! most one synthesis call is in flight and calls start in submission order.
//! Consecutive call starts are spaced by at least `min_spacing`.
//!
//! Failures (no credential, HTTP error, empty payload, playback error) are
//! logged and swallowed: the queue keeps going and every handle still resolves.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, instrument};

use crate::util::{fill_template, trunc_for_log};

#[derive(Debug, Error)]
pub enum TtsError {
  #[error("speech API key not configured")]
  MissingCredential,
  #[error("speech request failed: {0}")]
  Transport(String),
  #[error("speech provider returned HTTP {status}: {message}")]
  Api { status: u16, message: String },
  #[error("no audio data received")]
  EmptyAudio,
  #[error("audio payload could not be decoded: {0}")]
  Decode(String),
  #[error("playback failed: {0}")]
  Playback(String),
}

/// Turns text into raw audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
  async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, TtsError>;
}

/// Plays raw audio; resolves once playback has finished.
#[async_trait]
pub trait AudioSink: Send + Sync {
  async fn play(&self, audio: Vec<u8>) -> Result<(), TtsError>;
}

struct Job {
  text: String,
  done: oneshot::Sender<()>,
}

/// Cloneable front of the queue. The worker lives as long as any clone does.
#[derive(Clone)]
pub struct NarrationQueue {
  tx: mpsc::UnboundedSender<Job>,
}

/// Resolves when its task, and every task queued before it, has finished.
/// Dropping it does not cancel the task.
pub struct NarrationHandle {
  rx: oneshot::Receiver<()>,
}

impl NarrationHandle {
  pub async fn done(self) {
    // A closed channel means the worker is gone; nothing is left to wait for.
    let _ = self.rx.await;
  }
}

impl NarrationQueue {
  /// Start the worker on the current tokio runtime.
  pub fn spawn(
    synth: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    min_spacing: Duration,
    prompt_template: String,
  ) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_worker(rx, synth, sink, min_spacing, prompt_template));
    info!(target: "narration", spacing_ms = min_spacing.as_millis() as u64, "Narration queue started");
    Self { tx }
  }

  #[instrument(level = "debug", skip(self, text), fields(text_len = tracing::field::Empty))]
  pub fn speak(&self, text: impl Into<String>) -> NarrationHandle {
    let text = text.into();
    tracing::Span::current().record("text_len", text.len());
    let (done, rx) = oneshot::channel();
    let job = Job { text, done };
    if self.tx.send(job).is_err() {
      error!(target: "narration", "Narration worker stopped; request dropped");
    }
    NarrationHandle { rx }
  }
}

async fn run_worker(
  mut rx: mpsc::UnboundedReceiver<Job>,
  synth: Arc<dyn SpeechSynthesizer>,
  sink: Arc<dyn AudioSink>,
  min_spacing: Duration,
  prompt_template: String,
) {
  let mut last_start: Option<Instant> = None;

  while let Some(job) = rx.recv().await {
    if let Some(prev) = last_start {
      let ready = prev + min_spacing;
      if Instant::now() < ready {
        debug!(target: "narration", wait_ms = (ready - Instant::now()).as_millis() as u64, "Rate limit: delaying speech call");
        sleep_until(ready).await;
      }
    }
    last_start = Some(Instant::now());

    let prompt = fill_template(&prompt_template, &[("text", &job.text)]);
    if let Err(e) = narrate(synth.as_ref(), sink.as_ref(), &prompt).await {
      error!(target: "narration", text = %trunc_for_log(&job.text, 60), error = %e, "Narration failed; continuing");
    }

    let _ = job.done.send(());
  }

  debug!(target: "narration", "Narration queue closed");
}

async fn narrate(synth: &dyn SpeechSynthesizer, sink: &dyn AudioSink, prompt: &str) -> Result<(), TtsError> {
  let started = Instant::now();
  let audio = synth.synthesize(prompt).await?;
  if audio.is_empty() {
    return Err(TtsError::EmptyAudio);
  }
  debug!(target: "narration", bytes = audio.len(), elapsed = ?started.elapsed(), "Speech synthesized");
  sink.play(audio).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Mutex;

  const SPACING: Duration = Duration::from_millis(6000);

  /// Records every call start; fails for prompts containing `fail_on`.
  #[derive(Default)]
  struct RecordingSynth {
    starts: Mutex<Vec<(String, Instant)>>,
    fail_on: Option<&'static str>,
    latency: Duration,
  }

  #[async_trait]
  impl SpeechSynthesizer for RecordingSynth {
    async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, TtsError> {
      self.starts.lock().unwrap().push((prompt.to_string(), Instant::now()));
      tokio::time::sleep(self.latency).await;
      match self.fail_on {
        Some(f) if prompt.ends_with(f) => Err(TtsError::Transport("boom".into())),
        _ => Ok(vec![0u8; 4]),
      }
    }
  }

  #[derive(Default)]
  struct CountingSink {
    plays: AtomicU32,
  }

  #[async_trait]
  impl AudioSink for CountingSink {
    async fn play(&self, _audio: Vec<u8>) -> Result<(), TtsError> {
      tokio::time::sleep(Duration::from_millis(500)).await;
      self.plays.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  struct EmptySynth;

  #[async_trait]
  impl SpeechSynthesizer for EmptySynth {
    async fn synthesize(&self, _prompt: &str) -> Result<Vec<u8>, TtsError> {
      Ok(Vec::new())
    }
  }

  fn queue(synth: Arc<dyn SpeechSynthesizer>, sink: Arc<dyn AudioSink>) -> NarrationQueue {
    NarrationQueue::spawn(synth, sink, SPACING, "Say: {text}".into())
  }

  #[tokio::test(start_paused = true)]
  async fn calls_start_in_order_and_spaced() {
    let synth = Arc::new(RecordingSynth { latency: Duration::from_millis(300), ..Default::default() });
    let sink = Arc::new(CountingSink::default());
    let q = queue(synth.clone(), sink.clone());

    let a = q.speak("A");
    let b = q.speak("B");
    let c = q.speak("C");
    c.done().await;

    let starts = synth.starts.lock().unwrap().clone();
    let texts: Vec<&str> = starts.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(texts, vec!["Say: A", "Say: B", "Say: C"]);
    for pair in starts.windows(2) {
      assert!(pair[1].1 - pair[0].1 >= SPACING);
    }
    assert_eq!(sink.plays.load(Ordering::SeqCst), 3);

    // Earlier handles are already resolved once a later one is.
    a.done().await;
    b.done().await;
  }

  #[tokio::test(start_paused = true)]
  async fn spacing_is_measured_from_call_start() {
    // A call slower than the spacing leaves no extra wait before the next one.
    let synth = Arc::new(RecordingSynth { latency: Duration::from_millis(7000), ..Default::default() });
    let q = queue(synth.clone(), Arc::new(CountingSink::default()));

    q.speak("A");
    q.speak("B").done().await;

    let starts = synth.starts.lock().unwrap().clone();
    let gap = starts[1].1 - starts[0].1;
    assert!(gap >= Duration::from_millis(7500));
    assert!(gap < Duration::from_millis(7600));
  }

  #[tokio::test(start_paused = true)]
  async fn failure_does_not_poison_the_queue() {
    let synth = Arc::new(RecordingSynth { fail_on: Some("B"), ..Default::default() });
    let sink = Arc::new(CountingSink::default());
    let q = queue(synth.clone(), sink.clone());

    let a = q.speak("A");
    let b = q.speak("B");
    let c = q.speak("C");
    a.done().await;
    b.done().await;
    c.done().await;

    assert_eq!(synth.starts.lock().unwrap().len(), 3);
    assert_eq!(sink.plays.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn empty_audio_is_logged_not_played() {
    let sink = Arc::new(CountingSink::default());
    let q = queue(Arc::new(EmptySynth), sink.clone());
    q.speak("hello").done().await;
    assert_eq!(sink.plays.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn first_call_is_not_delayed() {
    let synth = Arc::new(RecordingSynth::default());
    let q = queue(synth.clone(), Arc::new(CountingSink::default()));
    let t0 = Instant::now();
    q.speak("now").done().await;
    let starts = synth.starts.lock().unwrap().clone();
    assert!(starts[0].1 - t0 < Duration::from_millis(10));
  }
}
