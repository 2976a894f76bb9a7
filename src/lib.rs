//! Adaptive certification engine.
//!
//! Given a candidate's answers to skill-tagged challenges, estimates the
//! candidate's ability and picks the next challenge to administer, until the
//! estimate is precise enough or the session runs out of answers or items.
//!
//! - `domain`    : skills, challenges, result codes and answers
//! - `catalog`   : read-only challenge catalog shared by sessions
//! - `estimator` : pluggable ability update policies (Elo default, staircase)
//! - `selector`  : next-challenge selection
//! - `session`   : per-candidate state machine and stopping rule
//! - `runner`    : async driver over tokio channels (timeouts, aborts)
//! - `score`     : read-only session result for score export
//!
//! Important env variables (read by `config` and `telemetry`):
//!   ENGINE_CONFIG_PATH : path to TOML config (estimator, session limits, catalog)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod estimator;
pub mod runner;
pub mod score;
pub mod seeds;
pub mod selector;
pub mod session;
pub mod telemetry;

pub use catalog::Catalog;
pub use config::EngineConfig;
pub use domain::{Answer, AnswerResult, Challenge, Skill, ValidationStatus};
pub use error::{EngineError, Interruption, Result};
pub use estimator::{AbilityEstimator, EloEstimator, Estimate, Policy, StaircaseEstimator};
pub use runner::{run_session, AnswerSubmitter, CandidateLink, SessionIo, Submission};
pub use score::SessionResult;
pub use session::{Session, SessionState, Step, TerminationCause};
