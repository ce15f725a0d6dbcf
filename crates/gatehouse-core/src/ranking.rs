//! Usage ranking: which areas a card holder visits most.

use std::{cmp::Reverse, collections::HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{area::AreaId, audit::AuditRecord};

/// How many areas a recommendation returns.
pub const TOP_AREAS: usize = 5;

/// Visit statistics for one area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStat {
  pub area_id:        AreaId,
  pub area_name:      String,
  pub visit_count:    u64,
  pub last_access_at: DateTime<Utc>,
  pub reason:         String,
}

/// Group `history` by area and return the `limit` most-visited areas.
///
/// Ordered by visit count descending, then most recent access descending,
/// then area id ascending so equal inputs always rank the same way. The
/// order of `history` itself does not matter.
pub fn rank_areas<'a, I>(history: I, limit: usize) -> Vec<AreaStat>
where
  I: IntoIterator<Item = &'a AuditRecord>,
{
  // area_id -> (count, latest record)
  let mut groups: HashMap<AreaId, (u64, &AuditRecord)> = HashMap::new();
  for record in history {
    groups
      .entry(record.area_id)
      .and_modify(|(count, latest)| {
        *count += 1;
        if record.recorded_at > latest.recorded_at {
          *latest = record;
        }
      })
      .or_insert((1, record));
  }

  let mut ranked: Vec<(u64, &AuditRecord)> = groups.into_values().collect();
  ranked.sort_by_key(|(count, latest)| {
    (Reverse(*count), Reverse(latest.recorded_at), latest.area_id)
  });

  ranked
    .into_iter()
    .take(limit)
    .map(|(count, latest)| AreaStat {
      area_id:        latest.area_id,
      area_name:      latest.area_name.clone(),
      visit_count:    count,
      last_access_at: latest.recorded_at,
      reason:         format!("accessed {} {count} time(s) recently", latest.area_name),
    })
    .collect()
}
