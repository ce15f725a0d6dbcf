//! [`AccessControl`], the service that ties the rules to a store and a clock.
//!
//! Badge handling lives in [`crate::decision`] and [`crate::movement`]; this
//! module holds construction, per-area serialisation and the read-only
//! queries.

use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset as _, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::{
  Error, Result,
  area::{Area, AreaId, AreaView},
  audit::{AuditQuery, AuditRecord},
  clock::{Clock, SystemClock, local_date},
  credential::normalize_credential,
  permission::is_authorized,
  ranking::{AreaStat, TOP_AREAS, rank_areas},
  store::AccessStore,
  user::{User, UserId},
};

/// Access-control engine over a store `S` and a time source `C`.
///
/// At most one decision or movement runs against a given area at a time;
/// requests for different areas proceed independently.
pub struct AccessControl<S, C = SystemClock> {
  store:  Arc<S>,
  clock:  C,
  offset: FixedOffset,
  locks:  DashMap<AreaId, Arc<Mutex<()>>>,
}

impl<S: AccessStore> AccessControl<S, SystemClock> {
  /// An engine on wall-clock time, with local time equal to UTC.
  pub fn new(store: Arc<S>) -> Self { Self::with_clock(store, SystemClock) }
}

impl<S, C> AccessControl<S, C>
where
  S: AccessStore,
  C: Clock,
{
  pub fn with_clock(store: Arc<S>, clock: C) -> Self {
    Self {
      store,
      clock,
      offset: Utc.fix(),
      locks: DashMap::new(),
    }
  }

  /// Set the local offset used for calendar days and return deadlines.
  pub fn with_offset(mut self, offset: FixedOffset) -> Self {
    self.offset = offset;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn offset(&self) -> FixedOffset { self.offset }

  pub(crate) fn now(&self) -> DateTime<Utc> { self.clock.now() }

  pub(crate) fn today(&self, now: DateTime<Utc>) -> NaiveDate {
    local_date(now, self.offset)
  }

  /// Wait for exclusive use of `area_id`. The guard releases on drop.
  pub(crate) async fn lock_area(&self, area_id: AreaId) -> OwnedMutexGuard<()> {
    let mutex = self.locks.entry(area_id).or_default().clone();
    mutex.lock_owned().await
  }

  /// Lock an existing area and load it under the guard.
  ///
  /// Unknown ids never get a lock slot. The area is read again once the
  /// guard is held so the caller sees the latest occupancy.
  pub(crate) async fn acquire_area(
    &self,
    area_id: AreaId,
  ) -> Result<(OwnedMutexGuard<()>, Area)> {
    check_area_id(area_id)?;
    self.load_area(area_id).await?;
    let guard = self.lock_area(area_id).await;
    let area = self.load_area(area_id).await?;
    Ok((guard, area))
  }

  pub(crate) async fn load_area(&self, area_id: AreaId) -> Result<Area> {
    self
      .store
      .find_area(area_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("area {area_id} does not exist")))
  }

  pub(crate) async fn find_user(&self, credential: &str) -> Result<Option<User>> {
    self
      .store
      .find_user_by_credential(credential)
      .await
      .map_err(Error::store)
  }

  /// Whether `user_id` may enter `area_id` on `date`.
  pub(crate) async fn check_permission(
    &self,
    user_id: UserId,
    area_id: AreaId,
    date: NaiveDate,
  ) -> Result<bool> {
    let permissions = self
      .store
      .find_permissions(user_id, area_id)
      .await
      .map_err(Error::store)?;
    Ok(is_authorized(&permissions, date))
  }

  // ── Queries ───────────────────────────────────────────────────────────

  /// Current status view of one area.
  pub async fn area_status(&self, area_id: AreaId) -> Result<AreaView> {
    check_area_id(area_id)?;
    let area = self.load_area(area_id).await?;
    Ok(area.view(self.now(), self.offset))
  }

  /// Status views of every area, in id order.
  pub async fn list_areas(&self) -> Result<Vec<AreaView>> {
    let now = self.now();
    let areas = self.store.list_areas().await.map_err(Error::store)?;
    Ok(areas.iter().map(|a| a.view(now, self.offset)).collect())
  }

  /// Active areas the card's holder may enter today, sorted by name.
  #[tracing::instrument(skip(self))]
  pub async fn authorized_areas(&self, credential: &str) -> Result<Vec<AreaView>> {
    let credential = normalize_credential(credential)?;
    let user = self
      .find_user(&credential)
      .await?
      .ok_or_else(|| Error::NotFound("card not recognized".into()))?;

    let now = self.now();
    let today = self.today(now);
    let permissions = self
      .store
      .find_user_permissions(user.user_id)
      .await
      .map_err(Error::store)?;
    let area_ids: BTreeSet<AreaId> = permissions
      .iter()
      .filter(|p| p.grants_on(today))
      .map(|p| p.area_id)
      .collect();
    if area_ids.is_empty() {
      debug!(user_id = user.user_id, "no current permissions");
      return Ok(Vec::new());
    }

    let mut areas: Vec<Area> = self
      .store
      .list_areas()
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|a| a.active && area_ids.contains(&a.area_id))
      .collect();
    areas.sort_by_cached_key(|a| a.name.to_lowercase());

    Ok(areas.iter().map(|a| a.view(now, self.offset)).collect())
  }

  /// The card holder's most visited areas, most frequent first.
  #[tracing::instrument(skip(self))]
  pub async fn recommend(&self, credential: &str) -> Result<Vec<AreaStat>> {
    let credential = normalize_credential(credential)?;
    let user = self
      .find_user(&credential)
      .await?
      .ok_or_else(|| Error::NotFound("card not recognized".into()))?;

    let history = self
      .store
      .audit_history(user.user_id)
      .await
      .map_err(Error::store)?;
    Ok(rank_areas(&history, TOP_AREAS))
  }

  /// Audit records matching `query`, most recent first.
  pub async fn history(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>> {
    if let (Some(after), Some(before)) = (query.recorded_after, query.recorded_before)
      && after > before
    {
      return Err(Error::InvalidInput("history window ends before it starts".into()));
    }
    self.store.search_audit(query).await.map_err(Error::store)
  }
}

/// Area ids start at 1.
fn check_area_id(area_id: AreaId) -> Result<()> {
  if area_id < 1 {
    return Err(Error::InvalidInput(format!("area id must be positive, got {area_id}")));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, sync::Mutex as StdMutex, time::Duration as StdDuration};

  use chrono::TimeZone as _;
  use uuid::Uuid;

  use super::*;
  use crate::{
    ErrorKind,
    area::{AreaStatus, Movement, Occupancy},
    audit::NewAuditRecord,
    clock::ManualClock,
    decision::DecisionRequest,
    movement::MovementRequest,
    permission::Permission,
  };

  /// A map-backed store for exercising the engine without SQLite.
  struct MemStore {
    users:       Vec<User>,
    areas:       StdMutex<HashMap<AreaId, Area>>,
    permissions: Vec<Permission>,
    audit:       StdMutex<Vec<AuditRecord>>,
  }

  impl AccessStore for MemStore {
    type Error = std::convert::Infallible;

    async fn find_user_by_credential(&self, credential: &str) -> Result<Option<User>, Self::Error> {
      Ok(self.users.iter().find(|u| u.credential == credential).cloned())
    }

    async fn find_area(&self, area_id: AreaId) -> Result<Option<Area>, Self::Error> {
      Ok(self.areas.lock().unwrap().get(&area_id).cloned())
    }

    async fn list_areas(&self) -> Result<Vec<Area>, Self::Error> {
      let mut areas: Vec<Area> = self.areas.lock().unwrap().values().cloned().collect();
      areas.sort_by_key(|a| a.area_id);
      Ok(areas)
    }

    async fn save_area(&self, area: Area) -> Result<(), Self::Error> {
      self.areas.lock().unwrap().insert(area.area_id, area);
      Ok(())
    }

    async fn find_permissions(
      &self,
      user_id: UserId,
      area_id: AreaId,
    ) -> Result<Vec<Permission>, Self::Error> {
      Ok(
        self
          .permissions
          .iter()
          .filter(|p| p.user_id == user_id && p.area_id == area_id)
          .cloned()
          .collect(),
      )
    }

    async fn find_user_permissions(&self, user_id: UserId) -> Result<Vec<Permission>, Self::Error> {
      Ok(self.permissions.iter().filter(|p| p.user_id == user_id).cloned().collect())
    }

    async fn append_audit(&self, record: NewAuditRecord) -> Result<AuditRecord, Self::Error> {
      let record = record.into_record(Uuid::new_v4());
      self.audit.lock().unwrap().push(record.clone());
      Ok(record)
    }

    async fn record_movement(
      &self,
      area: Area,
      record: NewAuditRecord,
    ) -> Result<AuditRecord, Self::Error> {
      let record = record.into_record(Uuid::new_v4());
      self.areas.lock().unwrap().insert(area.area_id, area);
      self.audit.lock().unwrap().push(record.clone());
      Ok(record)
    }

    async fn audit_history(&self, user_id: UserId) -> Result<Vec<AuditRecord>, Self::Error> {
      let audit = self.audit.lock().unwrap();
      Ok(audit.iter().rev().filter(|r| r.user_id == Some(user_id)).cloned().collect())
    }

    async fn search_audit(&self, _query: &AuditQuery) -> Result<Vec<AuditRecord>, Self::Error> {
      Ok(self.audit.lock().unwrap().iter().rev().cloned().collect())
    }
  }

  /// Alice (111) may use rooms 1 and 2 throughout March 2024.
  fn engine() -> AccessControl<MemStore, ManualClock> {
    let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    let room = |area_id| Area {
      area_id,
      name: format!("Room {area_id}"),
      active: true,
      occupancy: Occupancy::default(),
    };
    let grant = |area_id| Permission {
      permission_id: area_id,
      user_id: 1,
      area_id,
      access_level: "standard".into(),
      valid_from: day(1),
      valid_until: day(31),
      status: "active".into(),
    };
    let store = MemStore {
      users:       vec![User { user_id: 1, name: "Alice Moreau".into(), credential: "111".into() }],
      areas:       StdMutex::new(HashMap::from([(1, room(1)), (2, room(2))])),
      permissions: vec![grant(1), grant(2)],
      audit:       StdMutex::new(Vec::new()),
    };
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap());
    AccessControl::with_clock(Arc::new(store), clock)
  }

  fn movement(area_id: AreaId) -> MovementRequest {
    MovementRequest { credential: "111".into(), area_id, note: None }
  }

  fn decision(area_id: AreaId) -> DecisionRequest {
    DecisionRequest { credential: "111".into(), area_id, event_kind: None, note: None }
  }

  #[tokio::test]
  async fn unknown_area_ids_leave_no_lock_slot() {
    let engine = engine();
    for area_id in 100..600 {
      assert_eq!(engine.decide(decision(area_id)).await.unwrap_err().kind(), ErrorKind::NotFound);
      assert_eq!(
        engine.register_movement(movement(area_id)).await.unwrap_err().kind(),
        ErrorKind::NotFound
      );
    }
    assert!(engine.locks.is_empty());

    engine.decide(decision(1)).await.unwrap();
    engine.register_movement(movement(1)).await.unwrap();
    assert_eq!(engine.locks.len(), 1);
  }

  #[tokio::test]
  async fn non_positive_area_ids_are_invalid_input() {
    let engine = engine();
    for area_id in [0, -1, AreaId::MIN] {
      assert_eq!(engine.decide(decision(area_id)).await.unwrap_err().kind(), ErrorKind::InvalidInput);
      assert_eq!(
        engine.register_movement(movement(area_id)).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
      );
      assert_eq!(engine.area_status(area_id).await.unwrap_err().kind(), ErrorKind::InvalidInput);
    }
    assert!(engine.locks.is_empty());
    assert!(engine.store.audit.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn held_area_does_not_block_other_areas() {
    let engine = engine();
    let held = engine.lock_area(1).await;

    let other = tokio::time::timeout(StdDuration::from_secs(5), engine.register_movement(movement(2)))
      .await
      .expect("room 2 waited on room 1's lock")
      .unwrap();
    assert_eq!(other.movement_type, Movement::Entry);

    let waiting =
      tokio::time::timeout(StdDuration::from_millis(50), engine.register_movement(movement(1))).await;
    assert!(waiting.is_err());

    drop(held);
    let entered = engine.register_movement(movement(1)).await.unwrap();
    assert_eq!(entered.movement_type, Movement::Entry);
  }

  #[tokio::test]
  async fn list_areas_reports_each_status() {
    let engine = engine();
    engine.register_movement(movement(1)).await.unwrap();
    engine.clock.set(Utc.with_ymd_and_hms(2024, 3, 11, 4, 0, 0).unwrap());
    engine.register_movement(movement(2)).await.unwrap();
    engine.register_movement(movement(2)).await.unwrap();
    engine.clock.set(Utc.with_ymd_and_hms(2024, 3, 11, 6, 0, 0).unwrap());

    let statuses: Vec<_> = engine
      .list_areas()
      .await
      .unwrap()
      .into_iter()
      .map(|v| (v.area_id, v.status))
      .collect();
    assert_eq!(statuses, [(1, AreaStatus::Overdue), (2, AreaStatus::Free)]);
  }
}
