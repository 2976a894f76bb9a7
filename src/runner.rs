//! Async driver: runs a `Session` against a candidate over tokio channels.
//!
//! The engine sends each selected challenge on the outbox and then suspends
//! until the candidate's submission arrives. With a timeout configured, a
//! missing answer is recorded as `timedout` so the session always progresses.
//! An abort, or the candidate side hanging up, interrupts the session and
//! returns the partial answers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::domain::{AnswerResult, Challenge};
use crate::error::{EngineError, Result};
use crate::score::SessionResult;
use crate::session::{Session, Step};

/// Message from the candidate side.
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
  Answered { challenge_id: String, result: AnswerResult },
  Abort { reason: String },
}

/// Submission boundary. Raw result codes are parsed here, so a malformed code
/// is rejected before it can reach the session.
#[derive(Clone, Debug)]
pub struct AnswerSubmitter {
  tx: mpsc::Sender<Submission>,
}

impl AnswerSubmitter {
  pub async fn submit(&self, challenge_id: &str, code: &str) -> Result<()> {
    let result = code.parse::<AnswerResult>()?;
    self.submit_result(challenge_id, result).await
  }

  pub async fn submit_result(&self, challenge_id: &str, result: AnswerResult) -> Result<()> {
    self.send(Submission::Answered { challenge_id: challenge_id.to_string(), result }).await
  }

  pub async fn abort(&self, reason: impl Into<String>) -> Result<()> {
    self.send(Submission::Abort { reason: reason.into() }).await
  }

  async fn send(&self, msg: Submission) -> Result<()> {
    self.tx.send(msg).await.map_err(|_| EngineError::SessionClosed)
  }
}

/// Engine side of the channel pair.
pub struct SessionIo {
  outbox: mpsc::Sender<Arc<Challenge>>,
  inbox: mpsc::Receiver<Submission>,
}

/// Candidate side of the channel pair.
pub struct CandidateLink {
  pub challenges: mpsc::Receiver<Arc<Challenge>>,
  pub answers: AnswerSubmitter,
}

/// Create a connected engine/candidate channel pair.
pub fn channel(buffer: usize) -> (SessionIo, CandidateLink) {
  let (outbox, challenges) = mpsc::channel(buffer.max(1));
  let (tx, inbox) = mpsc::channel(buffer.max(1));
  (
    SessionIo { outbox, inbox },
    CandidateLink { challenges, answers: AnswerSubmitter { tx } },
  )
}

enum Awaited {
  Answer(AnswerResult),
  TimedOut,
  Abort(String),
  Disconnected,
}

/// Drive `session` to termination. Returns the session result, or
/// `SessionInterrupted` carrying the partial answer sequence.
#[instrument(level = "info", skip_all, fields(id = %session.id()))]
pub async fn run_session(mut session: Session, catalog: Arc<Catalog>, mut io: SessionIo) -> Result<SessionResult> {
  let answer_timeout = session.config().answer_timeout();

  loop {
    let challenge = match session.next(&catalog)? {
      Step::Administer(ch) => ch,
      Step::Finished(_) => break,
    };

    if io.outbox.send(challenge.clone()).await.is_err() {
      return Err(session.interrupt("candidate disconnected"));
    }

    let deadline = answer_timeout.map(|d| Instant::now() + d);
    match await_answer(&mut io.inbox, &challenge.id, deadline).await {
      Awaited::Answer(result) => {
        session.record(result)?;
      }
      Awaited::TimedOut => {
        session.time_out()?;
      }
      Awaited::Abort(reason) => return Err(session.interrupt(reason)),
      Awaited::Disconnected => return Err(session.interrupt("candidate disconnected")),
    }
  }

  let result = session.result().ok_or_else(|| EngineError::InvalidTransition {
    operation: "result",
    state: session.state().to_string(),
  })?;
  info!(
    target: "session",
    id = %result.session_id,
    cause = ?result.termination_cause,
    score = result.certified_score,
    answers = result.answers.len(),
    "Session finished"
  );
  Ok(result)
}

/// Wait for the answer to `challenge_id`. Late answers to earlier (timed out)
/// challenges are dropped without resetting the deadline.
async fn await_answer(inbox: &mut mpsc::Receiver<Submission>, challenge_id: &str, deadline: Option<Instant>) -> Awaited {
  loop {
    let received = match deadline {
      Some(at) => match timeout_at(at, inbox.recv()).await {
        Ok(msg) => msg,
        Err(_) => return Awaited::TimedOut,
      },
      None => inbox.recv().await,
    };

    match received {
      Some(Submission::Answered { challenge_id: id, result }) if id == challenge_id => return Awaited::Answer(result),
      Some(Submission::Answered { challenge_id: id, .. }) => {
        warn!(target: "session", expected = %challenge_id, got = %id, "Dropping answer for a challenge that is not pending");
      }
      Some(Submission::Abort { reason }) => return Awaited::Abort(reason),
      None => return Awaited::Disconnected,
    }
  }
}
