//! The append-only audit trail.
//!
//! Records are written once by the decision and movement paths and never
//! updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  area::{AreaId, Movement},
  user::UserId,
};

/// What kind of badge event a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  #[default]
  Entry,
  Exit,
  /// An authorization check with no physical movement attached.
  Probe,
}

impl From<Movement> for EventKind {
  fn from(m: Movement) -> Self {
    match m {
      Movement::Entry => Self::Entry,
      Movement::Exit => Self::Exit,
    }
  }
}

/// Outcome recorded for a badge event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessResult {
  Authorized,
  Denied,
}

impl AccessResult {
  pub fn from_authorized(authorized: bool) -> Self {
    if authorized { Self::Authorized } else { Self::Denied }
  }

  pub fn is_authorized(self) -> bool { matches!(self, Self::Authorized) }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
  pub record_id:   Uuid,
  /// Absent when the presented card did not resolve to a user.
  pub user_id:     Option<UserId>,
  pub area_id:     AreaId,
  /// Area name at the time the record was written.
  pub area_name:   String,
  pub event_kind:  EventKind,
  pub result:      AccessResult,
  pub credential:  String,
  pub note:        Option<String>,
  /// Stamped from the engine clock; never changes after creation.
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::AccessStore::append_audit`].
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
  pub user_id:     Option<UserId>,
  pub area_id:     AreaId,
  pub area_name:   String,
  pub event_kind:  EventKind,
  pub result:      AccessResult,
  pub credential:  String,
  pub note:        Option<String>,
  pub recorded_at: DateTime<Utc>,
}

impl NewAuditRecord {
  /// Stamp the record with an identity, producing what the store persists.
  pub fn into_record(self, record_id: Uuid) -> AuditRecord {
    AuditRecord {
      record_id,
      user_id: self.user_id,
      area_id: self.area_id,
      area_name: self.area_name,
      event_kind: self.event_kind,
      result: self.result,
      credential: self.credential,
      note: self.note,
      recorded_at: self.recorded_at,
    }
  }
}

/// Parameters for [`crate::store::AccessStore::search_audit`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
  pub user_id:         Option<UserId>,
  pub area_id:         Option<AreaId>,
  /// Inclusive lower bound on `recorded_at`.
  pub recorded_after:  Option<DateTime<Utc>>,
  /// Inclusive upper bound on `recorded_at`.
  pub recorded_before: Option<DateTime<Utc>>,
  pub limit:           Option<usize>,
}
