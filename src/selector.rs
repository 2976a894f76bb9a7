//! Next-challenge selection.
//!
//! Under the logistic model an item is most informative when its difficulty
//! sits closest to the current ability, so the selector picks the eligible
//! challenge minimizing `|max_difficulty - theta|`. Ties go to the lowest id.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, instrument};

use crate::catalog::Catalog;
use crate::domain::Challenge;
use crate::error::{EngineError, Result};

/// Validated and not yet administered.
pub fn is_eligible(challenge: &Challenge, administered: &HashSet<String>) -> bool {
  challenge.status.is_validated() && !administered.contains(&challenge.id)
}

#[instrument(level = "debug", skip(catalog, administered), fields(administered = administered.len()))]
pub fn select_next(theta: f64, catalog: &Catalog, administered: &HashSet<String>) -> Result<Arc<Challenge>> {
  let mut best: Option<(&Arc<Challenge>, f64)> = None;

  // Catalog iterates in ascending id order, so keeping the first strict minimum
  // resolves ties toward the lowest id.
  for ch in catalog.iter().filter(|c| is_eligible(c, administered)) {
    let gap = (f64::from(ch.max_difficulty()) - theta).abs();
    match best {
      Some((_, best_gap)) if gap >= best_gap => {}
      _ => best = Some((ch, gap)),
    }
  }

  match best {
    Some((ch, gap)) => {
      debug!(target: "session", id = %ch.id, difficulty = ch.max_difficulty(), gap, "Selected next challenge");
      Ok(ch.clone())
    }
    None => Err(EngineError::NoEligibleChallenge),
  }
}
