//! Domain models used by the engine: skills, challenges, result codes and answers.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Difficulty assumed for an answer whose challenge carries no measurable skill.
pub const NEUTRAL_DIFFICULTY: u32 = 2;

/// A named capability. Its difficulty is the trailing number of its name (`web5` -> 5).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Skill {
  name: String,
  difficulty: u32,
}

impl Skill {
  /// Parse a skill name. Fails with `InvalidSkillName` when the name has no
  /// trailing number, or when that number is zero or does not fit a `u32`.
  pub fn new(name: impl Into<String>) -> Result<Self> {
    let name = name.into();
    let digits_at = name
      .char_indices()
      .rev()
      .take_while(|(_, c)| c.is_ascii_digit())
      .last()
      .map(|(i, _)| i);

    let difficulty = match digits_at {
      Some(i) => name[i..].parse::<u32>().ok().filter(|d| *d >= 1),
      None => None,
    };

    match difficulty {
      Some(difficulty) => Ok(Self { name, difficulty }),
      None => Err(EngineError::InvalidSkillName(name)),
    }
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn difficulty(&self) -> u32 { self.difficulty }
}

impl fmt::Display for Skill {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

impl TryFrom<String> for Skill {
  type Error = EngineError;
  fn try_from(name: String) -> Result<Self> { Skill::new(name) }
}

impl From<Skill> for String {
  fn from(skill: Skill) -> String { skill.name }
}

/// Editorial state of a challenge. Only `Validated` challenges may be administered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
  Validated,
  Unvalidated,
  Archived,
}

impl ValidationStatus {
  pub fn is_validated(self) -> bool { matches!(self, ValidationStatus::Validated) }
}

impl FromStr for ValidationStatus {
  type Err = EngineError;

  /// Accepts the English codes and the French catalog labels.
  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "validated" | "validé" | "validé sans test" | "pré-validé" => Ok(ValidationStatus::Validated),
      "unvalidated" | "proposé" => Ok(ValidationStatus::Unvalidated),
      "archived" | "archivé" | "périmé" => Ok(ValidationStatus::Archived),
      _ => Err(EngineError::UnknownValidationStatus(s.to_string())),
    }
  }
}

impl fmt::Display for ValidationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ValidationStatus::Validated => "validated",
      ValidationStatus::Unvalidated => "unvalidated",
      ValidationStatus::Archived => "archived",
    };
    f.write_str(s)
  }
}

/// A test item tied to a validation status and to the skills it requires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
  pub id: String,
  pub status: ValidationStatus,
  #[serde(default)]
  pub skills: Vec<Skill>,
}

impl Challenge {
  pub fn new(id: impl Into<String>, status: ValidationStatus, skills: Vec<Skill>) -> Self {
    Self { id: id.into(), status, skills }
  }

  /// Hardest required skill, or `NEUTRAL_DIFFICULTY` when no skill is attached.
  pub fn max_difficulty(&self) -> u32 {
    self
      .skills
      .iter()
      .map(Skill::difficulty)
      .max()
      .unwrap_or(NEUTRAL_DIFFICULTY)
  }
}

/// Raw result code reported by the answer submission layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerResult {
  Ok,
  Ko,
  #[serde(alias = "partially")]
  Partial,
  Timedout,
  Skipped,
  Aband,
}

impl AnswerResult {
  pub const ALL: [AnswerResult; 6] = [
    AnswerResult::Ok,
    AnswerResult::Ko,
    AnswerResult::Partial,
    AnswerResult::Timedout,
    AnswerResult::Skipped,
    AnswerResult::Aband,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      AnswerResult::Ok => "ok",
      AnswerResult::Ko => "ko",
      AnswerResult::Partial => "partial",
      AnswerResult::Timedout => "timedout",
      AnswerResult::Skipped => "skipped",
      AnswerResult::Aband => "aband",
    }
  }
}

impl FromStr for AnswerResult {
  type Err = EngineError;

  /// Unknown codes are rejected, never coerced into a failure.
  fn from_str(s: &str) -> Result<Self> {
    match s.trim() {
      "ok" => Ok(AnswerResult::Ok),
      "ko" => Ok(AnswerResult::Ko),
      "partial" | "partially" => Ok(AnswerResult::Partial),
      "timedout" => Ok(AnswerResult::Timedout),
      "skipped" => Ok(AnswerResult::Skipped),
      "aband" => Ok(AnswerResult::Aband),
      other => Err(EngineError::UnknownResultCode(other.to_string())),
    }
  }
}

impl fmt::Display for AnswerResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Outcome of administering one challenge. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
  pub challenge: Option<Arc<Challenge>>,
  pub result: AnswerResult,
}

impl Answer {
  pub fn new(challenge: Option<Arc<Challenge>>, result: AnswerResult) -> Self {
    Self { challenge, result }
  }

  pub fn challenge_id(&self) -> Option<&str> {
    self.challenge.as_deref().map(|c| c.id.as_str())
  }

  /// Hardest skill of the answered challenge; 2 when the challenge or its skills are missing.
  pub fn max_difficulty(&self) -> u32 {
    self
      .challenge
      .as_deref()
      .map(Challenge::max_difficulty)
      .unwrap_or(NEUTRAL_DIFFICULTY)
  }

  /// 1 for `ok`, 0 for every other code. No partial credit.
  pub fn binary_outcome(&self) -> u8 {
    u8::from(self.result == AnswerResult::Ok)
  }
}
