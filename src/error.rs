//! Error types for the certification engine.
//!
//! Errors never carry a half-updated estimate: whatever state a session held
//! before the failing call is what an `Interruption` hands back.

use crate::domain::Answer;

/// Partial state returned when a session is interrupted before it terminates.
#[derive(Debug, Clone)]
pub struct Interruption {
    pub reason: String,
    pub last_ability: f64,
    pub answers: Vec<Answer>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid skill name (no trailing difficulty): {0:?}")]
    InvalidSkillName(String),

    #[error("Unknown validation status: {0:?}")]
    UnknownValidationStatus(String),

    #[error("Unknown answer result code: {0:?}")]
    UnknownResultCode(String),

    #[error("Duplicate challenge id in catalog: {0}")]
    DuplicateChallenge(String),

    #[error("No eligible challenge left to administer")]
    NoEligibleChallenge,

    #[error("Session interrupted after {} answers: {}", .0.answers.len(), .0.reason)]
    SessionInterrupted(Box<Interruption>),

    /// The session behind an `AnswerSubmitter` has already finished or been dropped.
    #[error("Session is closed")]
    SessionClosed,

    #[error("Operation {operation} not allowed while session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, EngineError>;
