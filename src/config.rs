//! Loading engine configuration (estimator, session limits, score scale and an
//! optional challenge catalog) from TOML.
//!
//! See `EngineConfig` for the expected schema. Every section is optional.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::{EngineError, Result};
use crate::estimator::Policy;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct EngineConfig {
  #[serde(default)]
  pub estimator: EstimatorConfig,
  #[serde(default)]
  pub session: SessionConfig,
  #[serde(default)]
  pub score: ScoreConfig,
  #[serde(default)]
  pub challenges: Vec<ChallengeCfg>,
}

/// Challenge entry accepted in TOML configuration.
/// `status` takes either the English code or the catalog's French label.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  pub id: String,
  pub status: String,
  #[serde(default)]
  pub skills: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
  pub policy: Policy,
  // elo
  pub k_initial: f64,
  pub k_decay: f64,
  // staircase
  pub step: f64,
}

impl Default for EstimatorConfig {
  fn default() -> Self {
    Self { policy: Policy::Elo, k_initial: 1.2, k_decay: 0.15, step: 1.0 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  pub theta_min: f64,
  pub theta_max: f64,
  /// Starting ability; midpoint of `[theta_min, theta_max]` when absent.
  pub theta_prior: Option<f64>,
  /// Stop once the standard error drops below this value.
  pub stop_standard_error: f64,
  /// Never stop on precision before this many answers.
  pub min_answers: usize,
  pub max_answers: usize,
  /// How long to wait for one answer before recording `timedout`.
  pub answer_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      theta_min: 1.0,
      theta_max: 8.0,
      theta_prior: None,
      stop_standard_error: 0.5,
      min_answers: 5,
      max_answers: 20,
      answer_timeout_ms: None,
    }
  }
}

impl SessionConfig {
  pub fn prior(&self) -> f64 {
    self
      .theta_prior
      .unwrap_or((self.theta_min + self.theta_max) / 2.0)
  }

  pub fn answer_timeout(&self) -> Option<std::time::Duration> {
    self.answer_timeout_ms.map(std::time::Duration::from_millis)
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
  /// Certified score given to an ability at `theta_max`.
  pub ceiling: f64,
}

impl Default for ScoreConfig {
  fn default() -> Self { Self { ceiling: 640.0 } }
}

impl SessionConfig {
  /// Bounds, prior and stopping values the session loop can work with.
  pub fn validate(&self) -> Result<()> {
    if !(self.theta_min.is_finite() && self.theta_max.is_finite()) || self.theta_min >= self.theta_max {
      return Err(EngineError::Config(format!(
        "theta bounds must be finite with theta_min < theta_max (got {} .. {})",
        self.theta_min, self.theta_max
      )));
    }
    let prior = self.prior();
    if !(self.theta_min..=self.theta_max).contains(&prior) {
      return Err(EngineError::Config(format!(
        "theta_prior {prior} outside [{}, {}]",
        self.theta_min, self.theta_max
      )));
    }
    if self.max_answers == 0 {
      return Err(EngineError::Config("max_answers must be at least 1".into()));
    }
    if !(self.stop_standard_error.is_finite() && self.stop_standard_error > 0.0) {
      return Err(EngineError::Config("stop_standard_error must be finite and positive".into()));
    }
    Ok(())
  }
}

impl EngineConfig {
  /// Reject values the estimator or the session loop cannot work with.
  /// Non-finite numbers are rejected everywhere: a NaN step would carry theta out of its bounds.
  pub fn validate(&self) -> Result<()> {
    self.session.validate()?;
    let e = &self.estimator;
    let finite = e.k_initial.is_finite() && e.k_decay.is_finite() && e.step.is_finite();
    if !finite || e.k_initial <= 0.0 || e.k_decay < 0.0 || e.step <= 0.0 {
      return Err(EngineError::Config(
        "k_initial and step must be finite and positive, k_decay finite and non-negative".into(),
      ));
    }
    if !(self.score.ceiling.is_finite() && self.score.ceiling > 0.0) {
      return Err(EngineError::Config("score ceiling must be finite and positive".into()));
    }
    Ok(())
  }
}

/// Parse and validate a config document.
pub fn parse_config(s: &str) -> Result<EngineConfig> {
  let cfg = toml::from_str::<EngineConfig>(s).map_err(|e| EngineError::Config(e.to_string()))?;
  cfg.validate()?;
  Ok(cfg)
}

/// Read, parse and validate a config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
  let s = std::fs::read_to_string(path)?;
  parse_config(&s)
}

/// Attempt to load `EngineConfig` from ENGINE_CONFIG_PATH. On any IO/parsing/validation error, returns None.
pub fn load_engine_config_from_env() -> Option<EngineConfig> {
  let path = std::env::var("ENGINE_CONFIG_PATH").ok()?;
  match load_config(&path) {
    Ok(cfg) => {
      info!(target: "engine", %path, challenges = cfg.challenges.len(), "Loaded engine config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "engine", %path, error = %e, "Failed to load engine config");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_uses_defaults() {
    let cfg = parse_config("").expect("defaults");
    assert_eq!(cfg.estimator.policy, Policy::Elo);
    assert_eq!(cfg.session.max_answers, 20);
    assert!((cfg.session.prior() - 4.5).abs() < 1e-12);
    assert!(cfg.challenges.is_empty());
  }

  #[test]
  fn full_document_parses() {
    let doc = r#"
      [estimator]
      policy = "staircase"
      step = 0.5

      [session]
      theta_min = 1.0
      theta_max = 5.0
      theta_prior = 3.0
      max_answers = 5
      answer_timeout_ms = 1500

      [score]
      ceiling = 1024.0

      [[challenges]]
      id = "recA"
      status = "validé"
      skills = ["url1", "web5"]

      [[challenges]]
      id = "recB"
      status = "archived"
    "#;
    let cfg = parse_config(doc).expect("valid config");
    assert_eq!(cfg.estimator.policy, Policy::Staircase);
    assert!((cfg.estimator.step - 0.5).abs() < 1e-12);
    assert!((cfg.estimator.k_initial - 1.2).abs() < 1e-12);
    assert_eq!(cfg.session.prior(), 3.0);
    assert_eq!(cfg.session.answer_timeout(), Some(std::time::Duration::from_millis(1500)));
    assert_eq!(cfg.challenges.len(), 2);
    assert_eq!(cfg.challenges[0].skills, vec!["url1", "web5"]);
    assert!(cfg.challenges[1].skills.is_empty());
  }

  #[test]
  fn invalid_values_are_rejected() {
    for doc in [
      "[session]\ntheta_min = 5.0\ntheta_max = 1.0",
      "[session]\ntheta_prior = 12.0",
      "[session]\nmax_answers = 0",
      "[estimator]\nk_initial = 0.0",
      "[estimator]\npolicy = \"bayes\"",
      "[score]\nceiling = -1.0",
      "[estimator]\nk_decay = inf",
      "[estimator]\nk_decay = nan",
      "[estimator]\nk_initial = inf",
      "[estimator]\nstep = nan",
      "[session]\nstop_standard_error = inf",
      "[session]\ntheta_prior = nan",
      "[session]\ntheta_max = inf",
      "[score]\nceiling = inf",
    ] {
      assert!(matches!(parse_config(doc), Err(EngineError::Config(_))), "{doc}");
    }
  }

  #[test]
  fn missing_file_is_an_io_error() {
    assert!(matches!(load_config("/nonexistent/engine.toml"), Err(EngineError::Io(_))));
  }
}
