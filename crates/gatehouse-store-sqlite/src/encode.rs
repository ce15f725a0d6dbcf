//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that lexical order matches chronological order.
//! Calendar dates are stored as `YYYY-MM-DD`. UUIDs are hyphenated lowercase.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use gatehouse_core::{
  area::{Area, Occupancy, Occupant},
  audit::{AccessResult, AuditRecord, EventKind},
  permission::Permission,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── EventKind ────────────────────────────────────────────────────────────────

pub fn encode_event_kind(k: EventKind) -> &'static str {
  match k {
    EventKind::Entry => "entry",
    EventKind::Exit => "exit",
    EventKind::Probe => "probe",
  }
}

pub fn decode_event_kind(s: &str) -> Result<EventKind> {
  match s {
    "entry" => Ok(EventKind::Entry),
    "exit" => Ok(EventKind::Exit),
    "probe" => Ok(EventKind::Probe),
    other => Err(Error::UnknownLabel { column: "event_kind", value: other.into() }),
  }
}

// ─── AccessResult ─────────────────────────────────────────────────────────────

pub fn encode_result(r: AccessResult) -> &'static str {
  match r {
    AccessResult::Authorized => "AUTHORIZED",
    AccessResult::Denied => "DENIED",
  }
}

pub fn decode_result(s: &str) -> Result<AccessResult> {
  match s {
    "AUTHORIZED" => Ok(AccessResult::Authorized),
    "DENIED" => Ok(AccessResult::Denied),
    other => Err(Error::UnknownLabel { column: "result", value: other.into() }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, name, credential";

pub fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
  Ok(User {
    user_id:    row.get(0)?,
    name:       row.get(1)?,
    credential: row.get(2)?,
  })
}

pub const AREA_COLUMNS: &str = "area_id, name, active, occupied, occupant_name, \
                                occupant_credential, occupant_user_id, last_movement_at";

/// Raw values read directly from an `areas` row.
pub struct RawArea {
  pub area_id:             i64,
  pub name:                String,
  pub active:              bool,
  pub occupied:            bool,
  pub occupant_name:       Option<String>,
  pub occupant_credential: Option<String>,
  pub occupant_user_id:    Option<i64>,
  pub last_movement_at:    Option<String>,
}

impl RawArea {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      area_id:             row.get(0)?,
      name:                row.get(1)?,
      active:              row.get(2)?,
      occupied:            row.get(3)?,
      occupant_name:       row.get(4)?,
      occupant_credential: row.get(5)?,
      occupant_user_id:    row.get(6)?,
      last_movement_at:    row.get(7)?,
    })
  }

  pub fn into_area(self) -> Result<Area> {
    let occupant = if self.occupied {
      match (self.occupant_user_id, self.occupant_name, self.occupant_credential) {
        (Some(user_id), Some(name), Some(credential)) => {
          Some(Occupant { user_id, name, credential })
        }
        _ => return Err(Error::CorruptOccupancy(self.area_id)),
      }
    } else {
      None
    };

    let last_movement_at = self.last_movement_at.as_deref().map(decode_dt).transpose()?;

    Ok(Area {
      area_id: self.area_id,
      name: self.name,
      active: self.active,
      occupancy: Occupancy { occupant, last_movement_at },
    })
  }
}

/// Column values for the occupancy half of an `areas` row.
pub struct OccupancyColumns {
  pub occupied:            bool,
  pub occupant_name:       Option<String>,
  pub occupant_credential: Option<String>,
  pub occupant_user_id:    Option<i64>,
  pub last_movement_at:    Option<String>,
}

impl From<&Occupancy> for OccupancyColumns {
  fn from(o: &Occupancy) -> Self {
    Self {
      occupied:            o.is_occupied(),
      occupant_name:       o.occupant.as_ref().map(|p| p.name.clone()),
      occupant_credential: o.occupant.as_ref().map(|p| p.credential.clone()),
      occupant_user_id:    o.occupant.as_ref().map(|p| p.user_id),
      last_movement_at:    o.last_movement_at.map(encode_dt),
    }
  }
}

pub const PERMISSION_COLUMNS: &str =
  "permission_id, user_id, area_id, access_level, valid_from, valid_until, status";

/// Raw values read directly from a `permissions` row.
pub struct RawPermission {
  pub permission_id: i64,
  pub user_id:       i64,
  pub area_id:       i64,
  pub access_level:  String,
  pub valid_from:    String,
  pub valid_until:   String,
  pub status:        String,
}

impl RawPermission {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      permission_id: row.get(0)?,
      user_id:       row.get(1)?,
      area_id:       row.get(2)?,
      access_level:  row.get(3)?,
      valid_from:    row.get(4)?,
      valid_until:   row.get(5)?,
      status:        row.get(6)?,
    })
  }

  pub fn into_permission(self) -> Result<Permission> {
    Ok(Permission {
      permission_id: self.permission_id,
      user_id:       self.user_id,
      area_id:       self.area_id,
      access_level:  self.access_level,
      valid_from:    decode_date(&self.valid_from)?,
      valid_until:   decode_date(&self.valid_until)?,
      status:        self.status,
    })
  }
}

pub const AUDIT_COLUMNS: &str = "record_id, user_id, area_id, area_name, event_kind, \
                                 result, credential, note, recorded_at";

/// Raw values read directly from an `audit_records` row.
pub struct RawAuditRecord {
  pub record_id:   String,
  pub user_id:     Option<i64>,
  pub area_id:     i64,
  pub area_name:   String,
  pub event_kind:  String,
  pub result:      String,
  pub credential:  String,
  pub note:        Option<String>,
  pub recorded_at: String,
}

impl RawAuditRecord {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      user_id:     row.get(1)?,
      area_id:     row.get(2)?,
      area_name:   row.get(3)?,
      event_kind:  row.get(4)?,
      result:      row.get(5)?,
      credential:  row.get(6)?,
      note:        row.get(7)?,
      recorded_at: row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<AuditRecord> {
    Ok(AuditRecord {
      record_id:   decode_uuid(&self.record_id)?,
      user_id:     self.user_id,
      area_id:     self.area_id,
      area_name:   self.area_name,
      event_kind:  decode_event_kind(&self.event_kind)?,
      result:      decode_result(&self.result)?,
      credential:  self.credential,
      note:        self.note,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
