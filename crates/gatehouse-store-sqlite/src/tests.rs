//! Integration tests for `SqliteStore`, and for `AccessControl` running on
//! top of it, against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone as _, Utc};
use gatehouse_core::{
  AccessControl, ErrorKind,
  area::{AreaStatus, Movement, Occupancy, Occupant},
  audit::{AccessResult, AuditQuery, EventKind, NewAuditRecord},
  clock::ManualClock,
  decision::DecisionRequest,
  movement::MovementRequest,
  store::AccessStore,
  user::User,
};

use crate::{Error, NewArea, NewPermission, NewUser, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn day(m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, m, d).unwrap() }

fn at(d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, d, h, mi, s).unwrap()
}

async fn user(s: &SqliteStore, name: &str, credential: &str) -> User {
  s.add_user(NewUser { name: name.into(), credential: credential.into() })
    .await
    .unwrap()
}

async fn area(s: &SqliteStore, name: &str, active: bool) -> i64 {
  s.add_area(NewArea { name: name.into(), active }).await.unwrap().area_id
}

async fn grant(
  s: &SqliteStore,
  user_id: i64,
  area_id: i64,
  from: NaiveDate,
  until: NaiveDate,
  status: &str,
) {
  s.grant_permission(NewPermission {
    user_id,
    area_id,
    access_level: "standard".into(),
    valid_from: from,
    valid_until: until,
    status: status.into(),
  })
  .await
  .unwrap();
}

fn audit(user_id: Option<i64>, area_id: i64, at: DateTime<Utc>) -> NewAuditRecord {
  NewAuditRecord {
    user_id,
    area_id,
    area_name: "Lab".into(),
    event_kind: EventKind::Entry,
    result: AccessResult::Authorized,
    credential: "111".into(),
    note: None,
    recorded_at: at,
  }
}

// ─── Users, areas, permissions ───────────────────────────────────────────────

#[tokio::test]
async fn add_user_and_find_by_credential() {
  let s = store().await;
  let alice = user(&s, "Alice Moreau", "111").await;

  let found = s.find_user_by_credential("111").await.unwrap();
  assert_eq!(found, Some(alice));
  assert!(s.find_user_by_credential("999").await.unwrap().is_none());
}

#[tokio::test]
async fn credentials_are_unique() {
  let s = store().await;
  user(&s, "Alice Moreau", "111").await;
  let dup = s
    .add_user(NewUser { name: "Impostor".into(), credential: "111".into() })
    .await;
  assert!(dup.is_err());
}

#[tokio::test]
async fn add_and_find_area() {
  let s = store().await;
  let id = area(&s, "Server Room", true).await;

  let found = s.find_area(id).await.unwrap().unwrap();
  assert_eq!(found.name, "Server Room");
  assert!(found.active);
  assert_eq!(found.occupancy, Occupancy::default());
  assert!(s.find_area(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn save_area_persists_occupancy() {
  let s = store().await;
  let alice = user(&s, "Alice Moreau", "111").await;
  let id = area(&s, "Server Room", true).await;

  let mut a = s.find_area(id).await.unwrap().unwrap();
  a.occupancy = Occupancy {
    occupant:         Some(Occupant::from_user(&alice, "111")),
    last_movement_at: Some(at(10, 20, 0, 0)),
  };
  s.save_area(a.clone()).await.unwrap();
  assert_eq!(s.find_area(id).await.unwrap().unwrap(), a);

  a.occupancy = Occupancy { occupant: None, last_movement_at: Some(at(10, 21, 0, 0)) };
  s.save_area(a.clone()).await.unwrap();
  assert_eq!(s.find_area(id).await.unwrap().unwrap(), a);
}

#[tokio::test]
async fn save_missing_area_fails() {
  let s = store().await;
  let ghost = gatehouse_core::area::Area {
    area_id:   42,
    name:      "Ghost".into(),
    active:    true,
    occupancy: Occupancy::default(),
  };
  assert!(matches!(s.save_area(ghost).await, Err(Error::AreaNotFound(42))));
}

#[tokio::test]
async fn permissions_are_scoped_to_pair() {
  let s = store().await;
  let alice = user(&s, "Alice Moreau", "111").await;
  let lab = area(&s, "Lab", true).await;
  let vault = area(&s, "Vault", true).await;
  grant(&s, alice.user_id, lab, day(3, 1), day(3, 31), "active").await;
  grant(&s, alice.user_id, lab, day(4, 1), day(4, 30), "suspended").await;
  grant(&s, alice.user_id, vault, day(3, 1), day(3, 31), "active").await;

  let lab_perms = s.find_permissions(alice.user_id, lab).await.unwrap();
  assert_eq!(lab_perms.len(), 2);
  assert!(lab_perms.iter().all(|p| p.area_id == lab));
  assert_eq!(lab_perms[1].valid_until, day(4, 30));

  assert_eq!(s.find_user_permissions(alice.user_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn grant_rejects_bad_input() {
  let s = store().await;
  let alice = user(&s, "Alice Moreau", "111").await;
  let lab = area(&s, "Lab", true).await;

  let inverted = s
    .grant_permission(NewPermission {
      user_id:      alice.user_id,
      area_id:      lab,
      access_level: "standard".into(),
      valid_from:   day(3, 31),
      valid_until:  day(3, 1),
      status:       "active".into(),
    })
    .await;
  assert!(matches!(inverted, Err(Error::InvertedWindow)));

  let orphan = s
    .grant_permission(NewPermission {
      user_id:      alice.user_id + 7,
      area_id:      lab,
      access_level: "standard".into(),
      valid_from:   day(3, 1),
      valid_until:  day(3, 31),
      status:       "active".into(),
    })
    .await;
  assert!(matches!(orphan, Err(Error::UserNotFound(_))));
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_is_most_recent_first() {
  let s = store().await;
  let alice = user(&s, "Alice Moreau", "111").await;
  let lab = area(&s, "Lab", true).await;

  for h in [9, 14, 11] {
    s.append_audit(audit(Some(alice.user_id), lab, at(10, h, 0, 0))).await.unwrap();
  }
  s.append_audit(audit(None, lab, at(10, 15, 0, 0))).await.unwrap();

  let history = s.audit_history(alice.user_id).await.unwrap();
  let hours: Vec<_> = history.iter().map(|r| r.recorded_at).collect();
  assert_eq!(hours, [at(10, 14, 0, 0), at(10, 11, 0, 0), at(10, 9, 0, 0)]);
}

#[tokio::test]
async fn search_audit_filters_window_and_limit() {
  let s = store().await;
  let lab = area(&s, "Lab", true).await;
  for h in 8..16 {
    s.append_audit(audit(None, lab, at(10, h, 0, 0))).await.unwrap();
  }

  let window = AuditQuery {
    recorded_after: Some(at(10, 10, 0, 0)),
    recorded_before: Some(at(10, 12, 0, 0)),
    ..AuditQuery::default()
  };
  assert_eq!(s.search_audit(&window).await.unwrap().len(), 3);

  let limited = AuditQuery { limit: Some(2), ..AuditQuery::default() };
  let latest = s.search_audit(&limited).await.unwrap();
  assert_eq!(latest.len(), 2);
  assert_eq!(latest[0].recorded_at, at(10, 15, 0, 0));
}

#[tokio::test]
async fn record_movement_on_missing_area_writes_nothing() {
  let s = store().await;
  let lab = area(&s, "Lab", true).await;
  let ghost = gatehouse_core::area::Area {
    area_id:   lab + 1,
    name:      "Ghost".into(),
    active:    true,
    occupancy: Occupancy::default(),
  };

  let res = s.record_movement(ghost, audit(None, lab, at(10, 9, 0, 0))).await;
  assert!(matches!(res, Err(Error::AreaNotFound(_))));
  assert!(s.search_audit(&AuditQuery::default()).await.unwrap().is_empty());
}

// ─── Engine over SQLite ──────────────────────────────────────────────────────

struct Fixture {
  store:  Arc<SqliteStore>,
  clock:  Arc<ManualClock>,
  engine: Arc<AccessControl<SqliteStore, Arc<ManualClock>>>,
}

impl Fixture {
  async fn new() -> Self {
    let store = Arc::new(store().await);
    let clock = Arc::new(ManualClock::new(at(10, 20, 0, 0)));
    let engine = Arc::new(AccessControl::with_clock(store.clone(), clock.clone()));
    Self { store, clock, engine }
  }

  async fn all_audit(&self) -> usize {
    self.store.search_audit(&AuditQuery::default()).await.unwrap().len()
  }

  async fn decide(&self, credential: &str, area_id: i64) -> gatehouse_core::Result<gatehouse_core::decision::Decision> {
    self
      .engine
      .decide(DecisionRequest {
        credential: credential.into(),
        area_id,
        event_kind: None,
        note: None,
      })
      .await
  }

  async fn badge(&self, credential: &str, area_id: i64) -> gatehouse_core::Result<gatehouse_core::movement::MovementResult> {
    self
      .engine
      .register_movement(MovementRequest { credential: credential.into(), area_id, note: None })
      .await
  }
}

/// A store with Alice (111) and Bruno (222), both allowed in the lab for
/// March 2024.
async fn lab_fixture() -> (Fixture, User, User, i64) {
  let f = Fixture::new().await;
  let alice = user(&f.store, "Alice Moreau", "111").await;
  let bruno = user(&f.store, "Bruno Silva", "222").await;
  let lab = area(&f.store, "Lab", true).await;
  grant(&f.store, alice.user_id, lab, day(3, 1), day(3, 31), "active").await;
  grant(&f.store, bruno.user_id, lab, day(3, 1), day(3, 31), "ACTIVE").await;
  (f, alice, bruno, lab)
}

// ── Decisions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn decide_authorizes_current_permission() {
  let (f, alice, _, lab) = lab_fixture().await;

  let d = f.decide("111", lab).await.unwrap();
  assert!(d.authorized);
  assert_eq!(d.result, AccessResult::Authorized);
  assert_eq!(d.user_id, Some(alice.user_id));
  assert_eq!(d.user_name.as_deref(), Some("Alice Moreau"));
  assert_eq!(d.area_name, "Lab");

  let history = f.store.audit_history(alice.user_id).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].event_kind, EventKind::Entry);
  assert_eq!(history[0].result, AccessResult::Authorized);
}

#[tokio::test]
async fn decide_denies_outside_window_and_still_audits() {
  let (f, alice, _, lab) = lab_fixture().await;
  f.clock.set(Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap());

  let d = f.decide("111", lab).await.unwrap();
  assert!(!d.authorized);
  assert_eq!(d.result, AccessResult::Denied);
  assert_eq!(d.user_id, Some(alice.user_id));

  let history = f.store.audit_history(alice.user_id).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].result, AccessResult::Denied);
}

#[tokio::test]
async fn decide_unknown_card_audits_without_user() {
  let (f, _, _, lab) = lab_fixture().await;

  let d = f.decide("000000", lab).await.unwrap();
  assert!(!d.authorized);
  assert_eq!(d.result, AccessResult::Denied);
  assert_eq!(d.message, "card not recognized");
  assert_eq!(d.user_id, None);

  let records = f.store.search_audit(&AuditQuery::default()).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].user_id, None);
  assert_eq!(records[0].credential, "000000");
}

#[tokio::test]
async fn decide_unknown_area_writes_nothing() {
  let (f, _, _, lab) = lab_fixture().await;

  let err = f.decide("111", lab + 50).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(f.all_audit().await, 0);
}

#[tokio::test]
async fn decide_records_requested_event_kind_and_note() {
  let (f, alice, _, lab) = lab_fixture().await;

  f.engine
    .decide(DecisionRequest {
      credential: " 111 ".into(),
      area_id:    lab,
      event_kind: Some(EventKind::Exit),
      note:       Some("drill".into()),
    })
    .await
    .unwrap();

  let history = f.store.audit_history(alice.user_id).await.unwrap();
  assert_eq!(history[0].event_kind, EventKind::Exit);
  assert_eq!(history[0].note.as_deref(), Some("drill"));
  assert_eq!(history[0].credential, "111");
}

#[tokio::test]
async fn decide_never_changes_occupancy() {
  let (f, _, _, lab) = lab_fixture().await;
  f.decide("111", lab).await.unwrap();

  let a = f.store.find_area(lab).await.unwrap().unwrap();
  assert_eq!(a.occupancy, Occupancy::default());
}

#[tokio::test]
async fn decide_rejects_blank_card() {
  let (f, _, _, lab) = lab_fixture().await;
  let err = f.decide("   ", lab).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidInput);
  assert_eq!(f.all_audit().await, 0);
}

// ── Movements ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn entry_then_exit_frees_area() {
  let (f, alice, _, lab) = lab_fixture().await;

  let entry = f.badge("111", lab).await.unwrap();
  assert_eq!(entry.movement_type, Movement::Entry);
  assert_eq!(entry.status, AreaStatus::Occupied);
  assert!(entry.occupied);
  assert_eq!(entry.occupant_name.as_deref(), Some("Alice Moreau"));
  assert_eq!(entry.deadline, Some(at(11, 5, 0, 0)));

  f.clock.advance(Duration::minutes(30));
  let exit = f.badge("111", lab).await.unwrap();
  assert_eq!(exit.movement_type, Movement::Exit);
  assert_eq!(exit.status, AreaStatus::Free);
  assert!(!exit.occupied);
  assert_eq!(exit.occupant_name, None);
  assert_eq!(exit.deadline, None);
  assert_eq!(exit.last_movement_at, Some(at(10, 20, 30, 0)));

  let stored = f.store.find_area(lab).await.unwrap().unwrap();
  assert_eq!(stored.occupancy.occupant, None);

  let history = f.store.audit_history(alice.user_id).await.unwrap();
  let kinds: Vec<_> = history.iter().map(|r| r.event_kind).collect();
  assert_eq!(kinds, [EventKind::Exit, EventKind::Entry]);
  assert!(history.iter().all(|r| r.result == AccessResult::Authorized));
}

#[tokio::test]
async fn other_card_cannot_release_area() {
  let (f, _, _, lab) = lab_fixture().await;
  f.badge("111", lab).await.unwrap();
  let before = f.store.find_area(lab).await.unwrap().unwrap();

  let err = f.badge("222", lab).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  assert_eq!(f.store.find_area(lab).await.unwrap().unwrap(), before);
  assert_eq!(f.all_audit().await, 1);
}

#[tokio::test]
async fn inactive_area_refuses_movement() {
  let (f, alice, _, _) = lab_fixture().await;
  let closed = area(&f.store, "Archive", false).await;
  grant(&f.store, alice.user_id, closed, day(3, 1), day(3, 31), "active").await;

  let err = f.badge("111", closed).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(f.all_audit().await, 0);
}

#[tokio::test]
async fn deactivated_area_blocks_exit() {
  let (f, _, _, lab) = lab_fixture().await;
  f.badge("111", lab).await.unwrap();
  f.store.set_area_active(lab, false).await.unwrap();

  let err = f.badge("111", lab).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert!(f.store.find_area(lab).await.unwrap().unwrap().occupancy.is_occupied());
}

#[tokio::test]
async fn unknown_card_blocks_movement() {
  let (f, _, _, lab) = lab_fixture().await;

  let err = f.badge("000000", lab).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidInput);
  let blank = f.badge("", lab).await.unwrap_err();
  assert_eq!(blank.kind(), ErrorKind::InvalidInput);
  assert_eq!(f.all_audit().await, 0);
}

#[tokio::test]
async fn missing_area_blocks_movement() {
  let (f, _, _, lab) = lab_fixture().await;
  let err = f.badge("111", lab + 9).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn movement_without_permission_is_forbidden() {
  let (f, _, _, lab) = lab_fixture().await;
  let carla = user(&f.store, "Carla Nunes", "333").await;
  let vault = area(&f.store, "Vault", true).await;
  grant(&f.store, carla.user_id, lab, day(3, 1), day(3, 31), "suspended").await;

  assert_eq!(f.badge("333", lab).await.unwrap_err().kind(), ErrorKind::Forbidden);
  assert_eq!(f.badge("111", vault).await.unwrap_err().kind(), ErrorKind::Forbidden);
  assert_eq!(f.all_audit().await, 0);
  assert!(!f.store.find_area(lab).await.unwrap().unwrap().occupancy.is_occupied());
}

#[tokio::test]
async fn exit_requires_current_permission() {
  let (f, _, _, lab) = lab_fixture().await;
  f.clock.set(Utc.with_ymd_and_hms(2024, 3, 31, 22, 0, 0).unwrap());
  f.badge("111", lab).await.unwrap();

  // The grant lapses overnight; the occupant cannot badge out.
  f.clock.advance(Duration::hours(4));
  assert_eq!(f.badge("111", lab).await.unwrap_err().kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn overdue_is_derived_on_read() {
  let (f, _, _, lab) = lab_fixture().await;
  f.badge("111", lab).await.unwrap();

  f.clock.set(at(11, 4, 59, 59));
  assert_eq!(f.engine.area_status(lab).await.unwrap().status, AreaStatus::Occupied);

  f.clock.set(at(11, 5, 0, 1));
  let view = f.engine.area_status(lab).await.unwrap();
  assert_eq!(view.status, AreaStatus::Overdue);
  assert_eq!(view.deadline, Some(at(11, 5, 0, 0)));

  // Overdue areas still release normally.
  let exit = f.badge("111", lab).await.unwrap();
  assert_eq!(exit.status, AreaStatus::Free);
}

#[tokio::test]
async fn list_areas_shows_free_occupied_and_overdue() {
  let (f, alice, bruno, lab) = lab_fixture().await;
  let vault = area(&f.store, "Vault", true).await;
  let dock = area(&f.store, "Dock", true).await;
  grant(&f.store, bruno.user_id, vault, day(3, 1), day(3, 31), "active").await;
  grant(&f.store, alice.user_id, dock, day(3, 1), day(3, 31), "active").await;

  // Lab is due back at 03-11 05:00, Vault at 03-12 05:00.
  f.badge("111", lab).await.unwrap();
  f.clock.set(at(11, 1, 0, 0));
  f.badge("222", vault).await.unwrap();
  f.clock.set(at(11, 6, 0, 0));

  let views = f.engine.list_areas().await.unwrap();
  let rows: Vec<_> = views
    .iter()
    .map(|v| (v.area_name.as_str(), v.status, v.occupant_name.as_deref()))
    .collect();
  assert_eq!(
    rows,
    [
      ("Lab", AreaStatus::Overdue, Some("Alice Moreau")),
      ("Vault", AreaStatus::Occupied, Some("Bruno Silva")),
      ("Dock", AreaStatus::Free, None),
    ]
  );
  assert_eq!(views[1].deadline, Some(at(12, 5, 0, 0)));
}

#[tokio::test]
async fn area_status_of_missing_area_is_not_found() {
  let f = Fixture::new().await;
  assert_eq!(f.engine.area_status(1).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_entries_have_one_winner() {
  let f = Fixture::new().await;
  let lab = area(&f.store, "Lab", true).await;
  for i in 0..8 {
    let u = user(&f.store, &format!("User {i}"), &format!("50{i}")).await;
    grant(&f.store, u.user_id, lab, day(3, 1), day(3, 31), "active").await;
  }

  let handles: Vec<_> = (0..8)
    .map(|i| {
      let engine = f.engine.clone();
      tokio::spawn(async move {
        engine
          .register_movement(MovementRequest {
            credential: format!("50{i}"),
            area_id:    lab,
            note:       None,
          })
          .await
      })
    })
    .collect();

  let mut entries = 0;
  let mut conflicts = 0;
  for h in handles {
    match h.await.unwrap() {
      Ok(m) => {
        assert_eq!(m.movement_type, Movement::Entry);
        entries += 1;
      }
      Err(e) => {
        assert_eq!(e.kind(), ErrorKind::Conflict);
        conflicts += 1;
      }
    }
  }
  assert_eq!((entries, conflicts), (1, 7));
  assert_eq!(f.all_audit().await, 1);
}

// ── Queries ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recommend_ranks_by_frequency() {
  let (f, _, _, lab) = lab_fixture().await;
  let alice_id = f.store.find_user_by_credential("111").await.unwrap().unwrap().user_id;
  let vault = area(&f.store, "Vault", true).await;
  grant(&f.store, alice_id, vault, day(3, 1), day(3, 31), "active").await;

  f.decide("111", lab).await.unwrap();
  f.clock.advance(Duration::minutes(1));
  f.decide("111", vault).await.unwrap();
  f.clock.advance(Duration::minutes(1));
  f.decide("111", lab).await.unwrap();

  let ranked = f.engine.recommend("111").await.unwrap();
  let summary: Vec<_> = ranked.iter().map(|s| (s.area_name.as_str(), s.visit_count)).collect();
  assert_eq!(summary, [("Lab", 2), ("Vault", 1)]);
  assert_eq!(ranked[0].last_access_at, at(10, 20, 2, 0));
}

#[tokio::test]
async fn recommend_edge_cases() {
  let (f, _, _, _) = lab_fixture().await;
  assert!(f.engine.recommend("222").await.unwrap().is_empty());
  assert_eq!(f.engine.recommend("424242").await.unwrap_err().kind(), ErrorKind::NotFound);
  assert_eq!(f.engine.recommend(" ").await.unwrap_err().kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn authorized_areas_lists_current_active_grants() {
  let (f, alice, _, _) = lab_fixture().await;
  let archive = area(&f.store, "archive", true).await;
  let closed = area(&f.store, "Boiler", false).await;
  let expired = area(&f.store, "Dock", true).await;
  grant(&f.store, alice.user_id, archive, day(3, 1), day(3, 31), "active").await;
  grant(&f.store, alice.user_id, closed, day(3, 1), day(3, 31), "active").await;
  grant(&f.store, alice.user_id, expired, day(2, 1), day(2, 28), "active").await;

  let names: Vec<_> = f
    .engine
    .authorized_areas("111")
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.area_name)
    .collect();
  assert_eq!(names, ["archive", "Lab"]);

  assert_eq!(
    f.engine.authorized_areas("000").await.unwrap_err().kind(),
    ErrorKind::NotFound
  );
}

#[tokio::test]
async fn history_rejects_inverted_window() {
  let f = Fixture::new().await;
  let query = AuditQuery {
    recorded_after: Some(at(11, 0, 0, 0)),
    recorded_before: Some(at(10, 0, 0, 0)),
    ..AuditQuery::default()
  };
  assert_eq!(f.engine.history(&query).await.unwrap_err().kind(), ErrorKind::InvalidInput);
}
