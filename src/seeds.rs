//! Seed data: a built-in catalog that makes the engine usable without any config.

use crate::config::ChallengeCfg;

fn entry(id: &str, status: &str, skills: &[&str]) -> ChallengeCfg {
  ChallengeCfg {
    id: id.into(),
    status: status.into(),
    skills: skills.iter().map(|s| s.to_string()).collect(),
  }
}

/// Five validated challenges spanning difficulties 1 to 5, plus a few that
/// must never be administered (unvalidated, archived).
pub fn seed_entries() -> Vec<ChallengeCfg> {
  vec![
    entry("rec001", "validé", &["@url1"]),
    entry("rec002", "validé", &["@url1", "@recherche2"]),
    entry("rec003", "validé", &["@rechinfo3", "@url2"]),
    entry("rec004", "validé sans test", &["@sourcesinfo4"]),
    entry("rec005", "pré-validé", &["@web5", "@rechinfo3"]),
    entry("rec006", "proposé", &["@web6"]),
    entry("rec007", "archivé", &["@url3"]),
  ]
}
