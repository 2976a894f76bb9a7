//! Challenge catalog: the read-only set of challenges sessions select from.
//!
//! A catalog is built once (from TOML entries or the built-in seeds) and then
//! shared behind an `Arc` by every concurrent session. Nothing in the engine
//! mutates it after construction.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use tracing::{error, info, instrument};

use crate::config::{ChallengeCfg, EngineConfig};
use crate::domain::{Challenge, Skill, ValidationStatus};
use crate::error::{EngineError, Result};
use crate::seeds::seed_entries;

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    by_id: BTreeMap<String, Arc<Challenge>>,
}

impl Catalog {
    /// Build a catalog, failing on the first invalid entry.
    #[instrument(level = "info", skip_all, fields(entries = entries.len()))]
    pub fn from_entries(entries: &[ChallengeCfg]) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for cc in entries {
            let ch = build_challenge(cc)?;
            if by_id.contains_key(&ch.id) {
                return Err(EngineError::DuplicateChallenge(ch.id));
            }
            by_id.insert(ch.id.clone(), Arc::new(ch));
        }
        let catalog = Self { by_id };
        catalog.log_inventory();
        Ok(catalog)
    }

    /// Build a catalog, skipping (and logging) entries that fail to parse.
    /// The first occurrence of a duplicated id wins.
    #[instrument(level = "info", skip_all, fields(entries = entries.len()))]
    pub fn from_entries_lenient(entries: &[ChallengeCfg]) -> Self {
        let mut by_id = BTreeMap::new();
        for cc in entries {
            match build_challenge(cc) {
                Ok(ch) => {
                    if by_id.contains_key(&ch.id) {
                        error!(target: "catalog", id = %ch.id, "Skipping catalog item: duplicate id.");
                        continue;
                    }
                    by_id.insert(ch.id.clone(), Arc::new(ch));
                }
                Err(e) => {
                    error!(target: "catalog", id = %cc.id, error = %e, "Skipping catalog item.");
                }
            }
        }
        let catalog = Self { by_id };
        catalog.log_inventory();
        catalog
    }

    /// Built-in seed catalog.
    pub fn seeded() -> Self {
        Self::from_entries_lenient(&seed_entries())
    }

    /// Catalog from config entries, falling back to the seeds when the config has none.
    pub fn from_config(cfg: Option<&EngineConfig>) -> Self {
        match cfg {
            Some(c) if !c.challenges.is_empty() => Self::from_entries_lenient(&c.challenges),
            _ => {
                info!(target: "catalog", "No challenges configured. Using built-in seeds.");
                Self::seeded()
            }
        }
    }

    pub fn from_challenges(challenges: impl IntoIterator<Item = Challenge>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for ch in challenges {
            if by_id.contains_key(&ch.id) {
                return Err(EngineError::DuplicateChallenge(ch.id));
            }
            by_id.insert(ch.id.clone(), Arc::new(ch));
        }
        Ok(Self { by_id })
    }

    pub fn get(&self, id: &str) -> Option<Arc<Challenge>> {
        self.by_id.get(id).cloned()
    }

    /// All challenges in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Challenge>> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn log_inventory(&self) {
        let mut count_by_status: HashMap<ValidationStatus, usize> = HashMap::new();
        for ch in self.by_id.values() {
            *count_by_status.entry(ch.status).or_default() += 1;
        }
        for (status, count) in count_by_status {
            info!(target: "catalog", %status, count, "Catalog inventory");
        }
    }
}

fn build_challenge(cc: &ChallengeCfg) -> Result<Challenge> {
    let status = cc.status.parse::<ValidationStatus>()?;
    let skills = cc
        .skills
        .iter()
        .map(|name| Skill::new(name.as_str()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Challenge::new(cc.id.clone(), status, skills))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(id: &str, status: &str, skills: &[&str]) -> ChallengeCfg {
        ChallengeCfg {
            id: id.into(),
            status: status.into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn strict_build_rejects_bad_skill() {
        let entries = vec![cfg("a", "validated", &["url1"]), cfg("b", "validated", &["web"])];
        match Catalog::from_entries(&entries) {
            Err(EngineError::InvalidSkillName(name)) => assert_eq!(name, "web"),
            other => panic!("expected InvalidSkillName, got {other:?}"),
        }
    }

    #[test]
    fn strict_build_rejects_duplicates_and_unknown_status() {
        let dup = vec![cfg("a", "validated", &[]), cfg("a", "archived", &[])];
        assert!(matches!(Catalog::from_entries(&dup), Err(EngineError::DuplicateChallenge(id)) if id == "a"));

        let bad_status = vec![cfg("a", "draft", &[])];
        assert!(matches!(
            Catalog::from_entries(&bad_status),
            Err(EngineError::UnknownValidationStatus(_))
        ));
    }

    #[test]
    fn lenient_build_drops_bad_entries() {
        let entries = vec![
            cfg("a", "validated", &["url1"]),
            cfg("b", "validated", &["web"]),
            cfg("c", "nope", &["url2"]),
            cfg("a", "archived", &[]),
            cfg("d", "archivé", &[]),
        ];
        let catalog = Catalog::from_entries_lenient(&entries);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").unwrap().status, ValidationStatus::Validated);
        assert_eq!(catalog.get("d").unwrap().status, ValidationStatus::Archived);
        assert!(catalog.get("b").is_none());
    }

    #[test]
    fn seeds_cover_difficulties_one_to_five() {
        let catalog = Catalog::seeded();
        let mut validated: Vec<u32> = catalog
            .iter()
            .filter(|c| c.status.is_validated())
            .map(|c| c.max_difficulty())
            .collect();
        validated.sort_unstable();
        assert_eq!(validated, vec![1, 2, 3, 4, 5]);
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn config_without_challenges_falls_back_to_seeds() {
        let cfg = EngineConfig::default();
        assert_eq!(Catalog::from_config(Some(&cfg)).len(), Catalog::seeded().len());
        assert_eq!(Catalog::from_config(None).len(), Catalog::seeded().len());
    }

    #[test]
    fn iteration_is_ordered_by_id() {
        let entries = vec![cfg("z", "validated", &[]), cfg("b", "validated", &[]), cfg("m", "validated", &[])];
        let catalog = Catalog::from_entries(&entries).unwrap();
        let ids: Vec<&str> = catalog.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "m", "z"]);
    }
}
