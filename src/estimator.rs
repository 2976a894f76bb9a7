//! Ability estimation.
//!
//! Each answer is a Bernoulli trial whose success probability follows the
//! logistic link `P = 1 / (1 + exp(-(theta - d)))`. Policies move `theta`
//! after every answer and accumulate the Fisher information `P (1 - P)` so the
//! session can tell when the estimate is precise enough.
//!
//! Every policy here keeps these properties:
//!   - an `ok` answer never lowers `theta`, any other result never raises it
//!   - for the same outcome, a harder item moves `theta` up at least as much
//!     (and an easier failed item moves it down at least as much)
//!   - no randomness: the same answers in the same order give the same trajectory
//!   - `theta` stays inside `[theta_min, theta_max]`

use serde::{Deserialize, Serialize};

use crate::config::{EstimatorConfig, SessionConfig};
use crate::domain::Answer;

/// Logistic probability of a correct answer for ability `theta` on difficulty `difficulty`.
pub fn success_probability(theta: f64, difficulty: f64) -> f64 {
  1.0 / (1.0 + (-(theta - difficulty)).exp())
}

/// Keep `theta` inside `[lo, hi]`. Unlike `f64::clamp` this never panics on
/// inverted or NaN bounds, and a NaN `theta` lands on `lo`.
pub fn bounded(theta: f64, lo: f64, hi: f64) -> f64 {
  let t = if theta.is_nan() { lo } else { theta };
  t.max(lo).min(hi)
}

/// Running ability estimate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
  pub theta: f64,
  /// Number of answers folded into this estimate.
  pub answered: usize,
  /// Accumulated Fisher information.
  pub information: f64,
}

impl Estimate {
  pub fn prior(theta: f64) -> Self {
    Self { theta, answered: 0, information: 0.0 }
  }

  /// `1 / sqrt(information)`; infinite before the first answer.
  pub fn standard_error(&self) -> f64 {
    if self.information > 0.0 {
      1.0 / self.information.sqrt()
    } else {
      f64::INFINITY
    }
  }

  fn advance(&self, theta: f64, difficulty: f64) -> Self {
    let p = success_probability(theta, difficulty);
    Self {
      theta,
      answered: self.answered + 1,
      information: self.information + p * (1.0 - p),
    }
  }
}

/// Pluggable update rule: `update(estimate, answer) -> estimate'`.
pub trait AbilityEstimator: Send + Sync {
  fn name(&self) -> &'static str;

  fn update(&self, estimate: &Estimate, answer: &Answer) -> Estimate;
}

impl<E: AbilityEstimator + ?Sized> AbilityEstimator for Box<E> {
  fn name(&self) -> &'static str { (**self).name() }

  fn update(&self, estimate: &Estimate, answer: &Answer) -> Estimate { (**self).update(estimate, answer) }
}

/// Elo-style gradient step on the likelihood of the newest observation:
/// `theta += K_n * (outcome - P(correct | theta, d))`, with
/// `K_n = k_initial / (1 + k_decay * n)` shrinking as answers accumulate.
#[derive(Clone, Debug)]
pub struct EloEstimator {
  pub k_initial: f64,
  pub k_decay: f64,
  pub theta_min: f64,
  pub theta_max: f64,
}

impl EloEstimator {
  pub fn step_size(&self, answered: usize) -> f64 {
    self.k_initial / (1.0 + self.k_decay * answered as f64)
  }
}

impl AbilityEstimator for EloEstimator {
  fn name(&self) -> &'static str { "elo" }

  fn update(&self, estimate: &Estimate, answer: &Answer) -> Estimate {
    let d = f64::from(answer.max_difficulty());
    let expected = success_probability(estimate.theta, d);
    let delta = self.step_size(estimate.answered) * (f64::from(answer.binary_outcome()) - expected);
    let theta = bounded(estimate.theta + delta, self.theta_min, self.theta_max);
    estimate.advance(theta, d)
  }
}

/// Rule-based heuristic: fixed-size steps scaled by how hard the item was.
/// Success moves up by `step * d / d_max`, failure down by `step * (d_max + 1 - d) / d_max`.
#[derive(Clone, Debug)]
pub struct StaircaseEstimator {
  pub step: f64,
  pub theta_min: f64,
  pub theta_max: f64,
}

impl StaircaseEstimator {
  fn difficulty_ceiling(&self) -> f64 {
    self.theta_max.max(1.0)
  }
}

impl AbilityEstimator for StaircaseEstimator {
  fn name(&self) -> &'static str { "staircase" }

  fn update(&self, estimate: &Estimate, answer: &Answer) -> Estimate {
    let d_max = self.difficulty_ceiling();
    let d = f64::from(answer.max_difficulty()).min(d_max);
    let delta = if answer.binary_outcome() == 1 {
      self.step * d / d_max
    } else {
      -self.step * (d_max + 1.0 - d) / d_max
    };
    let theta = bounded(estimate.theta + delta, self.theta_min, self.theta_max);
    estimate.advance(theta, d)
  }
}

/// Estimator policy selected in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
  #[default]
  Elo,
  Staircase,
}

impl Policy {
  pub fn build(self, estimator: &EstimatorConfig, session: &SessionConfig) -> Box<dyn AbilityEstimator> {
    match self {
      Policy::Elo => Box::new(EloEstimator {
        k_initial: estimator.k_initial,
        k_decay: estimator.k_decay,
        theta_min: session.theta_min,
        theta_max: session.theta_max,
      }),
      Policy::Staircase => Box::new(StaircaseEstimator {
        step: estimator.step,
        theta_min: session.theta_min,
        theta_max: session.theta_max,
      }),
    }
  }
}

/// Fold an answer sequence into the full estimate trajectory, prior first.
pub fn replay<E: AbilityEstimator + ?Sized>(estimator: &E, prior: Estimate, answers: &[Answer]) -> Vec<Estimate> {
  let mut trajectory = Vec::with_capacity(answers.len() + 1);
  trajectory.push(prior);
  let mut current = prior;
  for answer in answers {
    current = estimator.update(&current, answer);
    trajectory.push(current);
  }
  trajectory
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use proptest::prelude::*;

  use super::*;
  use crate::domain::{AnswerResult, Challenge, Skill, ValidationStatus};

  fn elo() -> EloEstimator {
    EloEstimator { k_initial: 1.2, k_decay: 0.15, theta_min: 1.0, theta_max: 8.0 }
  }

  fn staircase() -> StaircaseEstimator {
    StaircaseEstimator { step: 1.0, theta_min: 1.0, theta_max: 8.0 }
  }

  fn answer_at(difficulty: u32, result: AnswerResult) -> Answer {
    let skill = Skill::new(format!("web{difficulty}")).expect("skill");
    let challenge = Challenge::new(format!("rec{difficulty}"), ValidationStatus::Validated, vec![skill]);
    Answer::new(Some(Arc::new(challenge)), result)
  }

  fn estimators() -> Vec<Box<dyn AbilityEstimator>> {
    vec![Box::new(elo()), Box::new(staircase())]
  }

  #[test]
  fn probability_is_one_half_at_matching_difficulty() {
    assert!((success_probability(3.0, 3.0) - 0.5).abs() < 1e-12);
    assert!(success_probability(5.0, 3.0) > 0.5);
    assert!(success_probability(1.0, 3.0) < 0.5);
  }

  #[test]
  fn standard_error_shrinks_with_information() {
    let prior = Estimate::prior(3.0);
    assert!(prior.standard_error().is_infinite());
    let once = elo().update(&prior, &answer_at(3, AnswerResult::Ok));
    let twice = elo().update(&once, &answer_at(3, AnswerResult::Ko));
    assert!(once.standard_error().is_finite());
    assert!(twice.standard_error() < once.standard_error());
    assert_eq!(twice.answered, 2);
  }

  #[test]
  fn elo_step_size_decays() {
    let e = elo();
    assert!(e.step_size(0) > e.step_size(1));
    assert!(e.step_size(1) > e.step_size(10));
    assert!((e.step_size(0) - 1.2).abs() < 1e-12);
  }

  #[test]
  fn partial_is_scored_as_failure() {
    for est in estimators() {
      let prior = Estimate::prior(4.0);
      let partial = est.update(&prior, &answer_at(4, AnswerResult::Partial));
      let ko = est.update(&prior, &answer_at(4, AnswerResult::Ko));
      assert_eq!(partial, ko, "{}", est.name());
      assert!(partial.theta < 4.0);
    }
  }

  #[test]
  fn missing_challenge_is_scored_at_difficulty_two() {
    let est = elo();
    let prior = Estimate::prior(4.0);
    let missing = est.update(&prior, &Answer::new(None, AnswerResult::Ok));
    let at_two = est.update(&prior, &answer_at(2, AnswerResult::Ok));
    assert_eq!(missing, at_two);
  }

  #[test]
  fn non_finite_step_stays_in_bounds() {
    let runaway = EloEstimator { k_initial: 1.2, k_decay: f64::INFINITY, theta_min: 1.0, theta_max: 8.0 };
    let next = runaway.update(&Estimate::prior(3.0), &answer_at(3, AnswerResult::Ok));
    assert!((1.0..=8.0).contains(&next.theta), "theta {}", next.theta);
  }

  #[test]
  fn inverted_bounds_do_not_panic() {
    let est = StaircaseEstimator { step: 1.0, theta_min: 5.0, theta_max: 1.0 };
    let next = est.update(&Estimate::prior(3.0), &answer_at(3, AnswerResult::Ok));
    assert!(next.theta.is_finite());
    assert_eq!(bounded(f64::NAN, 1.0, 8.0), 1.0);
    assert_eq!(bounded(9.5, 1.0, 8.0), 8.0);
    assert_eq!(bounded(0.5, 1.0, 8.0), 1.0);
    assert_eq!(bounded(4.2, 1.0, 8.0), 4.2);
  }

  #[test]
  fn policy_builds_requested_estimator() {
    let est_cfg = EstimatorConfig::default();
    let session_cfg = SessionConfig::default();
    assert_eq!(Policy::Elo.build(&est_cfg, &session_cfg).name(), "elo");
    assert_eq!(Policy::Staircase.build(&est_cfg, &session_cfg).name(), "staircase");
  }

  fn result_strategy() -> impl Strategy<Value = AnswerResult> {
    prop::sample::select(AnswerResult::ALL.to_vec())
  }

  proptest! {
    #[test]
    fn correct_never_lowers_and_failure_never_raises(theta in 1.0f64..=8.0, d in 1u32..=8, result in result_strategy()) {
      for est in estimators() {
        let prior = Estimate::prior(theta);
        let next = est.update(&prior, &answer_at(d, result));
        if result == AnswerResult::Ok {
          prop_assert!(next.theta >= theta);
        } else {
          prop_assert!(next.theta <= theta);
        }
      }
    }

    #[test]
    fn harder_items_move_further(theta in 1.0f64..=8.0, easy in 1u32..=8, extra in 0u32..=4) {
      let hard = (easy + extra).min(8);
      for est in estimators() {
        let prior = Estimate::prior(theta);
        let up_easy = est.update(&prior, &answer_at(easy, AnswerResult::Ok)).theta - theta;
        let up_hard = est.update(&prior, &answer_at(hard, AnswerResult::Ok)).theta - theta;
        prop_assert!(up_hard >= up_easy - 1e-12);

        let down_easy = theta - est.update(&prior, &answer_at(easy, AnswerResult::Ko)).theta;
        let down_hard = theta - est.update(&prior, &answer_at(hard, AnswerResult::Ko)).theta;
        prop_assert!(down_easy >= down_hard - 1e-12);
      }
    }

    #[test]
    fn replay_is_deterministic_and_bounded(
      theta in 1.0f64..=8.0,
      steps in prop::collection::vec((1u32..=12, result_strategy()), 0..40),
    ) {
      let answers: Vec<Answer> = steps.iter().map(|(d, r)| answer_at(*d, *r)).collect();
      for est in estimators() {
        let first = replay(&est, Estimate::prior(theta), &answers);
        let second = replay(&est, Estimate::prior(theta), &answers);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), answers.len() + 1);
        for e in &first {
          prop_assert!(e.theta >= 1.0 && e.theta <= 8.0);
        }
      }
    }
  }
}
