//! Read-only session result handed to score export (serde ready).
//! Keep this small and stable so reporting can evolve independently of the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ScoreConfig, SessionConfig};
use crate::domain::Answer;
use crate::estimator::Estimate;
use crate::session::TerminationCause;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub final_ability: f64,
    pub standard_error: Option<f64>,
    pub termination_cause: TerminationCause,
    pub certified_score: u32,
    pub answers: Vec<Answer>,
    /// Per-skill tally, keyed by skill name.
    pub skills: BTreeMap<String, SkillTally>,
}

/// How a candidate fared on the challenges requiring one skill.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTally {
    pub administered: u32,
    pub correct: u32,
    pub difficulty: u32,
}

impl SessionResult {
    pub fn build(
        session_id: Uuid,
        estimate: Estimate,
        termination_cause: TerminationCause,
        answers: &[Answer],
        session: &SessionConfig,
        score: &ScoreConfig,
    ) -> Self {
        let se = estimate.standard_error();
        Self {
            session_id,
            final_ability: estimate.theta,
            standard_error: se.is_finite().then_some(se),
            termination_cause,
            certified_score: certified_score(estimate.theta, session, score),
            answers: answers.to_vec(),
            skills: tally_skills(answers),
        }
    }

    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.binary_outcome() == 1).count()
    }
}

/// Linear map of `theta` from `[theta_min, theta_max]` onto `[0, ceiling]`, rounded.
pub fn certified_score(theta: f64, session: &SessionConfig, score: &ScoreConfig) -> u32 {
    let span = session.theta_max - session.theta_min;
    let ratio = ((theta - session.theta_min) / span).clamp(0.0, 1.0);
    (ratio * score.ceiling).round() as u32
}

pub fn tally_skills(answers: &[Answer]) -> BTreeMap<String, SkillTally> {
    let mut out: BTreeMap<String, SkillTally> = BTreeMap::new();
    for answer in answers {
        let Some(ch) = answer.challenge.as_deref() else { continue };
        for skill in &ch.skills {
            let t = out.entry(skill.name().to_string()).or_default();
            t.administered += 1;
            t.correct += u32::from(answer.binary_outcome());
            t.difficulty = skill.difficulty();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::{AnswerResult, Challenge, Skill, ValidationStatus};

    fn bounds() -> SessionConfig {
        SessionConfig { theta_min: 1.0, theta_max: 5.0, ..SessionConfig::default() }
    }

    #[test]
    fn score_scales_linearly() {
        let scale = ScoreConfig { ceiling: 640.0 };
        assert_eq!(certified_score(1.0, &bounds(), &scale), 0);
        assert_eq!(certified_score(3.0, &bounds(), &scale), 320);
        assert_eq!(certified_score(5.0, &bounds(), &scale), 640);
        assert_eq!(certified_score(9.0, &bounds(), &scale), 640);
    }

    #[test]
    fn skills_are_tallied_per_name() {
        let url1 = Skill::new("url1").unwrap();
        let web5 = Skill::new("web5").unwrap();
        let both = Arc::new(Challenge::new("a", ValidationStatus::Validated, vec![url1.clone(), web5]));
        let only_url = Arc::new(Challenge::new("b", ValidationStatus::Validated, vec![url1]));
        let answers = vec![
            Answer::new(Some(both), AnswerResult::Ok),
            Answer::new(Some(only_url), AnswerResult::Partial),
            Answer::new(None, AnswerResult::Ok),
        ];
        let tally = tally_skills(&answers);
        assert_eq!(tally["url1"], SkillTally { administered: 2, correct: 1, difficulty: 1 });
        assert_eq!(tally["web5"], SkillTally { administered: 1, correct: 1, difficulty: 5 });
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn result_without_answers_has_no_standard_error() {
        let result = SessionResult::build(
            Uuid::new_v4(),
            Estimate::prior(3.0),
            TerminationCause::NoEligibleChallenge,
            &[],
            &bounds(),
            &ScoreConfig::default(),
        );
        assert!(result.standard_error.is_none());
        assert_eq!(result.correct_count(), 0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["termination_cause"], "no_eligible_challenge");
        assert_eq!(json["certified_score"], 320);
    }
}
