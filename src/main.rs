//! certify-sim · runs simulated candidates through the certification engine.
//!
//! Each candidate gets a hidden true ability and answers according to the
//! logistic model. Sessions run concurrently as independent tokio tasks and
//! share one read-only catalog. Results are printed as JSON lines.
//!
//! Important env variables:
//!   ENGINE_CONFIG_PATH : TOML config (estimator, session limits, catalog); seeds otherwise
//!   SIM_SESSIONS       : number of simulated candidates (default 3)
//!   SIM_SEED           : RNG seed (default 42)
//!   LOG_LEVEL          : tracing filter
//!   LOG_FORMAT         : "pretty" (default) or "json"
//!
//! Ctrl-C aborts every running session; partial answers are still reported.

use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use certify_engine::config::load_engine_config_from_env;
use certify_engine::estimator::success_probability;
use certify_engine::runner::{channel, run_session, CandidateLink};
use certify_engine::{telemetry, AnswerResult, Catalog, EngineError, Session};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
  std::env::var(key)
    .ok()
    .and_then(|v| v.parse::<T>().ok())
    .unwrap_or(default)
}

/// Answer every challenge the engine sends until it hangs up or Ctrl-C fires.
#[instrument(level = "debug", skip(link, rng, cancel))]
async fn simulate_candidate(
  candidate: usize,
  true_ability: f64,
  mut link: CandidateLink,
  mut rng: StdRng,
  mut cancel: tokio::sync::watch::Receiver<bool>,
) {
  loop {
    let ch = tokio::select! {
      ch = link.challenges.recv() => match ch {
        Some(ch) => ch,
        None => return,
      },
      Ok(()) = cancel.changed() => {
        let _ = link.answers.abort("cancelled by operator").await;
        return;
      }
    };

    let p = success_probability(true_ability, f64::from(ch.max_difficulty()));
    let result = if rng.gen_bool(p.clamp(0.0, 1.0)) { AnswerResult::Ok } else { AnswerResult::Ko };
    if let Err(e) = link.answers.submit_result(&ch.id, result).await {
      warn!(target: "certify_sim", candidate, error = %e, "Engine stopped listening");
      return;
    }
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = load_engine_config_from_env().unwrap_or_default();
  cfg.validate()?;
  let catalog = Arc::new(Catalog::from_config(Some(&cfg)));

  let sessions: usize = env_or("SIM_SESSIONS", 3);
  let seed: u64 = env_or("SIM_SEED", 42);
  let mut rng = StdRng::seed_from_u64(seed);
  info!(target: "certify_sim", sessions, seed, catalog = catalog.len(), "Starting simulation");

  let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!(target: "certify_sim", "Ctrl-C received; aborting sessions");
      let _ = cancel_tx.send(true);
    }
  });

  let mut tasks = JoinSet::new();
  for candidate in 0..sessions {
    let true_ability = rng.gen_range(cfg.session.theta_min..=cfg.session.theta_max);
    let candidate_rng = StdRng::seed_from_u64(rng.gen());
    let (io, link) = channel(1);
    tokio::spawn(simulate_candidate(candidate, true_ability, link, candidate_rng, cancel_rx.clone()));

    let session = Session::from_config(&cfg)?;
    let catalog = catalog.clone();
    tasks.spawn(async move { (candidate, true_ability, run_session(session, catalog, io).await) });
  }

  while let Some(joined) = tasks.join_next().await {
    let (candidate, true_ability, outcome) = joined?;
    match outcome {
      Ok(result) => {
        info!(
          target: "certify_sim",
          candidate,
          true_ability,
          estimated = result.final_ability,
          cause = ?result.termination_cause,
          "Candidate certified"
        );
        println!("{}", serde_json::to_string(&result)?);
      }
      Err(EngineError::SessionInterrupted(partial)) => {
        warn!(target: "certify_sim", candidate, reason = %partial.reason, answers = partial.answers.len(), last_ability = partial.last_ability, "Session interrupted");
      }
      Err(e) => {
        error!(target: "certify_sim", candidate, error = %e, "Session failed");
      }
    }
  }

  Ok(())
}
