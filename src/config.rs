//! Loading application configuration (narration + quiz settings) from TOML.
//!
//! See `AppConfig` for the expected schema. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct AppConfig {
  #[serde(default)]
  pub narration: NarrationCfg,
  #[serde(default)]
  pub quiz: QuizCfg,
}

/// Settings for the narration queue and the speech provider.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarrationCfg {
  /// Minimum spacing between the starts of two synthesis calls.
  /// The provider allows 10 requests per minute.
  pub min_spacing_ms: u64,
  /// Wraps the text sent to the provider; `{text}` is replaced.
  pub prompt_template: String,
  pub voice: String,
  /// Sample rate of the 16-bit mono PCM the provider returns.
  pub sample_rate_hz: u32,
}

impl Default for NarrationCfg {
  fn default() -> Self {
    Self {
      min_spacing_ms: 6000,
      prompt_template: "Say with a friendly and encouraging tone: {text}".into(),
      voice: "Zephyr".into(),
      sample_rate_hz: 24_000,
    }
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuizCfg {
  /// Number of problems in a quiz session.
  pub length: u32,
}

impl Default for QuizCfg {
  fn default() -> Self {
    Self { length: 5 }
  }
}

/// Load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns defaults.
pub fn load_app_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("APP_CONFIG_PATH") else {
    return AppConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "tinhnhanh_backend", %path, "Loaded app config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "tinhnhanh_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "tinhnhanh_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
      AppConfig::default()
    }
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  let mut cfg: AppConfig = toml::from_str(s)?;
  if cfg.quiz.length == 0 {
    cfg.quiz.length = QuizCfg::default().length;
  }
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    assert_eq!(parse_app_config("").unwrap(), AppConfig::default());
  }

  #[test]
  fn partial_override() {
    let cfg = parse_app_config(
      r#"
[narration]
min_spacing_ms = 1000
voice = "Puck"

[quiz]
length = 10
"#,
    )
    .unwrap();
    assert_eq!(cfg.narration.min_spacing_ms, 1000);
    assert_eq!(cfg.narration.voice, "Puck");
    assert_eq!(cfg.narration.sample_rate_hz, 24_000);
    assert!(cfg.narration.prompt_template.contains("{text}"));
    assert_eq!(cfg.quiz.length, 10);
  }

  #[test]
  fn zero_length_quiz_falls_back() {
    let cfg = parse_app_config("[quiz]\nlength = 0\n").unwrap();
    assert_eq!(cfg.quiz.length, 5);
  }

  #[test]
  fn bad_types_are_rejected() {
    assert!(parse_app_config("[narration]\nmin_spacing_ms = \"soon\"\n").is_err());
  }
}
