//! Aggregate reports over merged records.
//!
//! Like the rest of the read models these are computed per request from the
//! records the caller may see; nothing is cached or stored.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Status, view::MergedAchievement};

/// Bucket for records whose details carry no competition level.
pub const UNSPECIFIED_LEVEL: &str = "unspecified";

/// Which records a statistics request covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
  /// Every student. Administrators only.
  All,
  /// Students currently assigned to the calling lecturer.
  Advisees,
  /// The calling student's own records.
  Own,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
  pub year:  i32,
  pub month: u32,
  pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
  pub total:                usize,
  pub by_status:            BTreeMap<Status, usize>,
  pub by_type:              BTreeMap<String, usize>,
  /// Records per creation month, oldest first.
  pub by_period:            Vec<PeriodCount>,
  pub by_competition_level: BTreeMap<String, usize>,
  /// Sum of points over verified records.
  pub verified_points:      i64,
}

impl Statistics {
  pub fn tally<'a>(records: impl IntoIterator<Item = &'a MergedAchievement>) -> Self {
    let mut stats = Self::default();
    let mut periods: BTreeMap<(i32, u32), usize> = BTreeMap::new();

    for record in records {
      stats.total += 1;
      *stats.by_status.entry(record.status).or_default() += 1;
      *stats.by_type.entry(record.achievement_type.clone()).or_default() += 1;
      *periods
        .entry((record.created_at.year(), record.created_at.month()))
        .or_default() += 1;

      let level = record
        .details
        .get("competitionLevel")
        .and_then(|v| v.as_str())
        .filter(|l| !l.is_empty())
        .unwrap_or(UNSPECIFIED_LEVEL);
      *stats.by_competition_level.entry(level.to_owned()).or_default() += 1;

      if record.status == Status::Verified {
        stats.verified_points += record.points;
      }
    }

    stats.by_period = periods
      .into_iter()
      .map(|((year, month), count)| PeriodCount { year, month, count })
      .collect();
    stats
  }
}

/// Statistics together with the scope they were computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedStatistics {
  pub scope:      Scope,
  #[serde(flatten)]
  pub statistics: Statistics,
}

/// One student's live records and their statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
  pub student_id:   Uuid,
  pub statistics:   Statistics,
  pub achievements: Vec<MergedAchievement>,
}

impl StudentReport {
  pub fn build(student_id: Uuid, achievements: Vec<MergedAchievement>) -> Self {
    Self { student_id, statistics: Statistics::tally(&achievements), achievements }
  }
}
