//! Controlled areas and the occupancy state machine.
//!
//! An area is either free or held by exactly one occupant. Entry and exit are
//! pure transitions over [`Occupancy`] values; the caller persists the
//! returned state. "Overdue" is never stored: it is derived on read from the
//! last movement timestamp and the return deadline.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::{User, UserId};

/// Identifier of a controlled area.
pub type AreaId = i64;

/// Local hour of the day after a movement by which an occupant must return
/// the area.
pub const RETURN_HOUR: i64 = 5;

// ─── Occupancy ───────────────────────────────────────────────────────────────

/// The holder of an occupied area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupant {
  pub user_id:    UserId,
  pub name:       String,
  /// The card that opened the area; only this card may release it.
  pub credential: String,
}

impl Occupant {
  pub fn from_user(user: &User, credential: impl Into<String>) -> Self {
    Self {
      user_id:    user.user_id,
      name:       user.name.clone(),
      credential: credential.into(),
    }
  }
}

/// The mutable occupancy sub-state of an area.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupancy {
  /// Present iff the area is occupied.
  pub occupant:         Option<Occupant>,
  /// Instant of the most recent transition; `None` if never used.
  pub last_movement_at: Option<DateTime<Utc>>,
}

/// Direction of a badge movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
  Entry,
  Exit,
}

/// Derived display status of an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaStatus {
  Free,
  Occupied,
  /// Occupied past the return deadline.
  Overdue,
}

/// Why an occupancy transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("area {0} is inactive")]
  Inactive(AreaId),

  #[error("area is already occupied")]
  AlreadyOccupied,

  #[error("area is not occupied")]
  NotOccupied,

  #[error("area is held by a different card")]
  OccupantMismatch,
}

impl Occupancy {
  pub fn is_occupied(&self) -> bool { self.occupant.is_some() }

  /// Free → Occupied.
  pub fn enter(
    &self,
    occupant: Occupant,
    now: DateTime<Utc>,
  ) -> Result<Self, TransitionError> {
    if self.is_occupied() {
      return Err(TransitionError::AlreadyOccupied);
    }
    Ok(Self { occupant: Some(occupant), last_movement_at: Some(now) })
  }

  /// Occupied → Free. Only the card that opened the area may close it.
  pub fn exit(
    &self,
    credential: &str,
    now: DateTime<Utc>,
  ) -> Result<Self, TransitionError> {
    match &self.occupant {
      None => Err(TransitionError::NotOccupied),
      Some(o) if o.credential != credential => {
        Err(TransitionError::OccupantMismatch)
      }
      Some(_) => Ok(Self { occupant: None, last_movement_at: Some(now) }),
    }
  }

  /// Perform whichever transition a badge action implies: entry when free,
  /// exit when occupied.
  pub fn toggle(
    &self,
    occupant: Occupant,
    now: DateTime<Utc>,
  ) -> Result<(Movement, Self), TransitionError> {
    if self.is_occupied() {
      Ok((Movement::Exit, self.exit(&occupant.credential, now)?))
    } else {
      Ok((Movement::Entry, self.enter(occupant, now)?))
    }
  }

  /// The return deadline while occupied.
  pub fn deadline(&self, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if !self.is_occupied() {
      return None;
    }
    self.last_movement_at.map(|at| return_deadline(at, offset))
  }

  pub fn status(&self, now: DateTime<Utc>, offset: FixedOffset) -> AreaStatus {
    if !self.is_occupied() {
      return AreaStatus::Free;
    }
    match self.deadline(offset) {
      Some(deadline) if now > deadline => AreaStatus::Overdue,
      _ => AreaStatus::Occupied,
    }
  }
}

/// 05:00 local time on the calendar day after `last_movement`'s local day.
///
/// Floors to the local day boundary, adds one day, then sets the time of day.
/// This is calendar arithmetic, not a fixed 24-hour window: an entry at 00:10
/// and one at 23:50 on the same day share a deadline.
pub fn return_deadline(
  last_movement: DateTime<Utc>,
  offset: FixedOffset,
) -> DateTime<Utc> {
  let local_midnight = last_movement
    .with_timezone(&offset)
    .date_naive()
    .and_time(NaiveTime::default());
  let local_deadline =
    local_midnight + Duration::days(1) + Duration::hours(RETURN_HOUR);
  (local_deadline - offset).and_utc()
}

// ─── Area ────────────────────────────────────────────────────────────────────

/// A controlled physical zone.
///
/// Name and `active` are managed externally; the core owns `occupancy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
  pub area_id:   AreaId,
  pub name:      String,
  /// Inactive areas refuse every movement.
  pub active:    bool,
  pub occupancy: Occupancy,
}

impl Area {
  /// Apply a badge action to this area, returning the movement performed and
  /// the updated area. `self` is left untouched.
  pub fn badge(
    &self,
    occupant: Occupant,
    now: DateTime<Utc>,
  ) -> Result<(Movement, Area), TransitionError> {
    if !self.active {
      return Err(TransitionError::Inactive(self.area_id));
    }
    let (movement, occupancy) = self.occupancy.toggle(occupant, now)?;
    Ok((movement, Area { occupancy, ..self.clone() }))
  }

  /// The read model for this area as of `now`.
  pub fn view(&self, now: DateTime<Utc>, offset: FixedOffset) -> AreaView {
    AreaView {
      area_id:          self.area_id,
      area_name:        self.name.clone(),
      active:           self.active,
      status:           self.occupancy.status(now, offset),
      occupied:         self.occupancy.is_occupied(),
      occupant_name:    self.occupancy.occupant.as_ref().map(|o| o.name.clone()),
      occupant_user_id: self.occupancy.occupant.as_ref().map(|o| o.user_id),
      last_movement_at: self.occupancy.last_movement_at,
      deadline:         self.occupancy.deadline(offset),
    }
  }
}

/// Computed, never-stored status view of an area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaView {
  pub area_id:          AreaId,
  pub area_name:        String,
  pub active:           bool,
  pub status:           AreaStatus,
  pub occupied:         bool,
  pub occupant_name:    Option<String>,
  pub occupant_user_id: Option<UserId>,
  pub last_movement_at: Option<DateTime<Utc>>,
  pub deadline:         Option<DateTime<Utc>>,
}
