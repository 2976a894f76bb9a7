//! Session loop state machine for one candidate.
//!
//! ```text
//! SelectingNext --next()--> AwaitingAnswer --record()--> Updating --> SelectingNext
//!       |                                                   |
//!       +--(no eligible challenge)--> Terminated <--(stop)--+
//! ```
//!
//! `interrupt()` moves any non-terminal state to `Interrupted` and hands the
//! partial answer sequence back to the caller. The session never retries on its
//! own; re-asking a timed out challenge is the caller's decision.

use std::{collections::HashSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::{EngineConfig, ScoreConfig, SessionConfig};
use crate::domain::{Answer, AnswerResult, Challenge};
use crate::error::{EngineError, Interruption, Result};
use crate::estimator::{AbilityEstimator, Estimate};
use crate::score::SessionResult;
use crate::selector::select_next;

/// Why a session stopped. Each cause is reported distinctly downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
  /// Standard error of the estimate fell below the configured threshold.
  PrecisionReached,
  /// The configured maximum number of answers was reached.
  MaxAnswers,
  /// The selector found nothing left to administer.
  NoEligibleChallenge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
  SelectingNext,
  AwaitingAnswer,
  Updating,
  Terminated(TerminationCause),
  Interrupted,
}

impl SessionState {
  pub fn is_final(self) -> bool {
    matches!(self, SessionState::Terminated(_) | SessionState::Interrupted)
  }
}

impl fmt::Display for SessionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SessionState::SelectingNext => f.write_str("selecting_next"),
      SessionState::AwaitingAnswer => f.write_str("awaiting_answer"),
      SessionState::Updating => f.write_str("updating"),
      SessionState::Terminated(cause) => write!(f, "terminated({cause:?})"),
      SessionState::Interrupted => f.write_str("interrupted"),
    }
  }
}

/// What the caller should do after `next()`.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
  Administer(Arc<Challenge>),
  Finished(TerminationCause),
}

pub struct Session {
  id: Uuid,
  config: SessionConfig,
  score: ScoreConfig,
  estimator: Box<dyn AbilityEstimator>,
  state: SessionState,
  estimate: Estimate,
  trajectory: Vec<Estimate>,
  answers: Vec<Answer>,
  administered: HashSet<String>,
  pending: Option<Arc<Challenge>>,
}

impl Session {
  /// Start a session at the configured prior. Fails with `Config` when the
  /// bounds, prior or stopping values are unusable.
  pub fn new(config: SessionConfig, estimator: Box<dyn AbilityEstimator>) -> Result<Self> {
    config.validate()?;
    let prior = Estimate::prior(config.prior());
    let id = Uuid::new_v4();
    info!(target: "session", %id, theta = prior.theta, policy = estimator.name(), "Session started");
    Ok(Self {
      id,
      config,
      score: ScoreConfig::default(),
      estimator,
      state: SessionState::SelectingNext,
      estimate: prior,
      trajectory: vec![prior],
      answers: Vec::new(),
      administered: HashSet::new(),
      pending: None,
    })
  }

  /// Session using the estimator policy, limits and score scale from `cfg`.
  pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
    cfg.validate()?;
    let estimator = cfg.estimator.policy.build(&cfg.estimator, &cfg.session);
    Ok(Self::new(cfg.session.clone(), estimator)?.with_score(cfg.score.clone()))
  }

  pub fn with_score(mut self, score: ScoreConfig) -> Self {
    self.score = score;
    self
  }

  pub fn id(&self) -> Uuid { self.id }

  pub fn state(&self) -> SessionState { self.state }

  pub fn estimate(&self) -> Estimate { self.estimate }

  /// Estimate after every answer, prior first.
  pub fn trajectory(&self) -> &[Estimate] { &self.trajectory }

  pub fn answers(&self) -> &[Answer] { &self.answers }

  pub fn config(&self) -> &SessionConfig { &self.config }

  /// Challenge currently waiting for an answer.
  pub fn pending(&self) -> Option<&Arc<Challenge>> { self.pending.as_ref() }

  /// Select the next challenge, or terminate when nothing is eligible.
  #[instrument(level = "debug", skip(self, catalog), fields(id = %self.id))]
  pub fn next(&mut self, catalog: &Catalog) -> Result<Step> {
    match self.state {
      SessionState::SelectingNext => {}
      SessionState::Terminated(cause) => return Ok(Step::Finished(cause)),
      other => return Err(self.invalid("next", other)),
    }

    match select_next(self.estimate.theta, catalog, &self.administered) {
      Ok(ch) => {
        self.administered.insert(ch.id.clone());
        self.pending = Some(ch.clone());
        self.state = SessionState::AwaitingAnswer;
        Ok(Step::Administer(ch))
      }
      Err(EngineError::NoEligibleChallenge) => {
        self.terminate(TerminationCause::NoEligibleChallenge);
        Ok(Step::Finished(TerminationCause::NoEligibleChallenge))
      }
      Err(e) => Err(e),
    }
  }

  /// Record the answer to the pending challenge, update the estimate and apply
  /// the stopping rule. Returns the termination cause when the session ends here.
  #[instrument(level = "debug", skip(self), fields(id = %self.id))]
  pub fn record(&mut self, result: AnswerResult) -> Result<Option<TerminationCause>> {
    if self.state != SessionState::AwaitingAnswer {
      return Err(self.invalid("record", self.state));
    }

    self.state = SessionState::Updating;
    let answer = Answer::new(self.pending.take(), result);
    let next = self.estimator.update(&self.estimate, &answer);
    debug!(
      target: "session",
      id = %self.id,
      challenge = answer.challenge_id().unwrap_or("-"),
      %result,
      difficulty = answer.max_difficulty(),
      theta_before = self.estimate.theta,
      theta_after = next.theta,
      se = next.standard_error(),
      "Answer recorded"
    );
    self.answers.push(answer);
    self.estimate = next;
    self.trajectory.push(next);

    match self.stopping_cause() {
      Some(cause) => {
        self.terminate(cause);
        Ok(Some(cause))
      }
      None => {
        self.state = SessionState::SelectingNext;
        Ok(None)
      }
    }
  }

  /// The candidate did not answer in time.
  pub fn time_out(&mut self) -> Result<Option<TerminationCause>> {
    warn!(target: "session", id = %self.id, challenge = self.pending.as_ref().map(|c| c.id.as_str()).unwrap_or("-"), "Answer timed out");
    self.record(AnswerResult::Timedout)
  }

  /// Abort the session. The returned error carries every answer recorded so far.
  pub fn interrupt(&mut self, reason: impl Into<String>) -> EngineError {
    if self.state.is_final() {
      return self.invalid("interrupt", self.state);
    }
    let reason = reason.into();
    self.state = SessionState::Interrupted;
    self.pending = None;
    warn!(target: "session", id = %self.id, %reason, answers = self.answers.len(), "Session interrupted");
    EngineError::SessionInterrupted(Box::new(Interruption {
      reason,
      last_ability: self.estimate.theta,
      answers: self.answers.clone(),
    }))
  }

  /// Read-only result, available once the session has terminated.
  pub fn result(&self) -> Option<SessionResult> {
    match self.state {
      SessionState::Terminated(cause) => Some(SessionResult::build(
        self.id,
        self.estimate,
        cause,
        &self.answers,
        &self.config,
        &self.score,
      )),
      _ => None,
    }
  }

  fn stopping_cause(&self) -> Option<TerminationCause> {
    let answered = self.answers.len();
    if answered >= self.config.min_answers && self.estimate.standard_error() < self.config.stop_standard_error {
      Some(TerminationCause::PrecisionReached)
    } else if answered >= self.config.max_answers {
      Some(TerminationCause::MaxAnswers)
    } else {
      None
    }
  }

  fn terminate(&mut self, cause: TerminationCause) {
    self.state = SessionState::Terminated(cause);
    info!(
      target: "session",
      id = %self.id,
      ?cause,
      theta = self.estimate.theta,
      se = self.estimate.standard_error(),
      answers = self.answers.len(),
      "Session terminated"
    );
  }

  fn invalid(&self, operation: &'static str, state: SessionState) -> EngineError {
    EngineError::InvalidTransition { operation, state: state.to_string() }
  }
}
