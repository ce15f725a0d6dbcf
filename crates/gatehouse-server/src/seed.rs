//! JSON fixture loader for bootstrapping a fresh store.
//!
//! ```json
//! {
//!   "users": [{ "name": "Alice", "credential": "111" }],
//!   "areas": [{ "name": "Lab" }],
//!   "permissions": [{
//!     "credential": "111", "area": "Lab", "accessLevel": "standard",
//!     "validFrom": "2024-01-01", "validUntil": "2024-12-31"
//!   }]
//! }
//! ```

use std::{
  collections::{HashMap, HashSet},
  path::Path,
};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use gatehouse_core::{permission::ACTIVE_STATUS, store::AccessStore as _};
use gatehouse_store_sqlite::{NewArea, NewPermission, NewUser, SqliteStore};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SeedData {
  pub users:       Vec<NewUser>,
  pub areas:       Vec<NewArea>,
  pub permissions: Vec<SeedGrant>,
}

/// A permission addressed by card and area name instead of row ids.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedGrant {
  pub credential:   String,
  pub area:         String,
  pub access_level: String,
  pub valid_from:   NaiveDate,
  pub valid_until:  NaiveDate,
  #[serde(default = "default_status")]
  pub status:       String,
}

fn default_status() -> String { ACTIVE_STATUS.to_string() }

pub fn read(path: &Path) -> anyhow::Result<SeedData> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read seed file {path:?}"))?;
  serde_json::from_str(&raw).with_context(|| format!("invalid seed file {path:?}"))
}

/// Insert `seed` into `store`. A store that already has areas is left alone.
///
/// The whole fixture is checked before the first row is written, so a bad
/// fixture leaves the store empty. Returns `false` when seeding was skipped.
pub async fn apply(store: &SqliteStore, seed: SeedData) -> anyhow::Result<bool> {
  if !store.list_areas().await?.is_empty() {
    tracing::warn!("store already populated; seed skipped");
    return Ok(false);
  }
  seed.validate()?;

  let mut users = HashMap::new();
  for input in seed.users {
    let user = store.add_user(input).await?;
    users.insert(user.credential, user.user_id);
  }

  let mut areas = HashMap::new();
  for input in seed.areas {
    let area = store.add_area(input).await?;
    areas.insert(area.name, area.area_id);
  }

  let grants = seed.permissions.len();
  for grant in seed.permissions {
    let (Some(&user_id), Some(&area_id)) = (users.get(&grant.credential), areas.get(&grant.area))
    else {
      bail!("seed permission for card {} has no matching rows", grant.credential);
    };
    store
      .grant_permission(NewPermission {
        user_id,
        area_id,
        access_level: grant.access_level,
        valid_from: grant.valid_from,
        valid_until: grant.valid_until,
        status: grant.status,
      })
      .await?;
  }

  tracing::info!(users = users.len(), areas = areas.len(), grants, "seed loaded");
  Ok(true)
}

impl SeedData {
  /// Reject duplicate keys, dangling grant references and inverted windows.
  pub fn validate(&self) -> anyhow::Result<()> {
    let mut credentials = HashSet::new();
    for user in &self.users {
      if !credentials.insert(user.credential.as_str()) {
        bail!("seed lists card {} twice", user.credential);
      }
    }
    let mut names = HashSet::new();
    for area in &self.areas {
      if !names.insert(area.name.as_str()) {
        bail!("seed lists area {:?} twice", area.name);
      }
    }
    for grant in &self.permissions {
      if !credentials.contains(grant.credential.as_str()) {
        bail!("seed permission references unknown card {}", grant.credential);
      }
      if !names.contains(grant.area.as_str()) {
        bail!("seed permission references unknown area {:?}", grant.area);
      }
      if grant.valid_until < grant.valid_from {
        bail!("seed permission for card {} ends before it starts", grant.credential);
      }
    }
    Ok(())
  }
}
