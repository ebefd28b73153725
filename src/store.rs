//! Append-only persistence of the two flat lists: personal history and the leaderboard.
//!
//! Each list is one JSON array file. Appends rewrite the file through a
//! temporary sibling + rename so a crash never leaves a half-written list.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{HistoryEntry, ScoreEntry};

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage I/O error on {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("serialization error: {0}")]
  Serde(#[from] serde_json::Error),
  /// The history entry is on disk, the leaderboard entry is not.
  #[error("history saved but the leaderboard could not be updated: {0}")]
  HistoryOnly(#[source] Box<StoreError>),
}

/// One persisted list.
pub struct JsonList<T> {
  path: PathBuf,
  items: RwLock<Vec<T>>,
}

impl<T> JsonList<T>
where
  T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
  /// Load the list; a missing file is an empty list, a corrupt one is logged and ignored.
  pub async fn open(path: PathBuf) -> Self {
    let items = match tokio::fs::read_to_string(&path).await {
      Ok(s) => match serde_json::from_str::<Vec<T>>(&s) {
        Ok(v) => {
          info!(target: "tinhnhanh_backend", path = %path.display(), count = v.len(), "Loaded list");
          v
        }
        Err(e) => {
          error!(target: "tinhnhanh_backend", path = %path.display(), error = %e, "Corrupt list file; starting empty");
          Vec::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
      Err(e) => {
        error!(target: "tinhnhanh_backend", path = %path.display(), error = %e, "Failed to read list file; starting empty");
        Vec::new()
      }
    };
    Self { path, items: RwLock::new(items) }
  }

  pub async fn snapshot(&self) -> Vec<T> {
    self.items.read().await.clone()
  }
}

async fn write_atomic<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
  let io_err = |source| StoreError::Io { path: path.display().to_string(), source };
  let body = serde_json::to_vec_pretty(items)?;
  if let Some(dir) = path.parent() {
    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
  }
  let tmp = path.with_extension("json.tmp");
  tokio::fs::write(&tmp, body).await.map_err(io_err)?;
  tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
  Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  User,
  #[default]
  Score,
  Timestamp,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
  Ascending,
  #[default]
  Descending,
}

pub struct Store {
  history: JsonList<HistoryEntry>,
  scores: JsonList<ScoreEntry>,
}

impl Store {
  pub async fn open(dir: &Path) -> Self {
    Self {
      history: JsonList::open(dir.join("history.json")).await,
      scores: JsonList::open(dir.join("scores.json")).await,
    }
  }

  /// Persist the records of a finished run. With a score entry both files are
  /// written or, when the leaderboard write fails, the history append is undone.
  #[instrument(level = "info", skip_all, fields(user = %history.user, score = history.score))]
  pub async fn record_finished(&self, history: HistoryEntry, score: Option<ScoreEntry>) -> Result<(), StoreError> {
    // Lock order: history, then scores.
    let mut saved_history = self.history.items.write().await;
    let mut saved_scores = self.scores.items.write().await;

    let mut next_history = saved_history.clone();
    next_history.push(history);
    write_atomic(&self.history.path, &next_history).await?;

    if let Some(entry) = score {
      let mut next_scores = saved_scores.clone();
      next_scores.push(entry);
      if let Err(e) = write_atomic(&self.scores.path, &next_scores).await {
        if let Err(rollback) = write_atomic(&self.history.path, saved_history.as_slice()).await {
          error!(target: "tinhnhanh_backend", error = %rollback, "Could not undo history append");
          *saved_history = next_history;
          return Err(StoreError::HistoryOnly(Box::new(e)));
        }
        warn!(target: "tinhnhanh_backend", error = %e, "Leaderboard write failed; history append undone");
        return Err(e);
      }
      *saved_scores = next_scores;
    }

    *saved_history = next_history;
    Ok(())
  }

  /// History of one user, most recent first.
  pub async fn history_for(&self, user: &str) -> Vec<HistoryEntry> {
    let mut out: Vec<HistoryEntry> = self.history.snapshot().await.into_iter().filter(|e| e.user == user).collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
  }

  /// Full leaderboard in the requested order. Ties keep insertion order.
  pub async fn leaderboard(&self, key: SortKey, direction: SortDirection) -> Vec<ScoreEntry> {
    let mut out = self.scores.snapshot().await;
    sort_scores(&mut out, key, direction);
    if out.is_empty() {
      debug!(target: "tinhnhanh_backend", "Leaderboard requested but no quiz scores recorded yet");
    }
    out
  }
}

pub fn sort_scores(scores: &mut [ScoreEntry], key: SortKey, direction: SortDirection) {
  scores.sort_by(|a, b| {
    let ord = match key {
      SortKey::User => a.user.to_lowercase().cmp(&b.user.to_lowercase()),
      SortKey::Score => a.score.cmp(&b.score),
      SortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
    };
    match direction {
      SortDirection::Ascending => ord,
      SortDirection::Descending => ord.reverse(),
    }
  });
}
