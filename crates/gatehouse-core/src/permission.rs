//! Permission grants and the rule that decides whether they authorize entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{area::AreaId, user::UserId};

/// Identifier of a permission record.
pub type PermissionId = i64;

/// The lifecycle status that makes a grant usable, compared
/// case-insensitively.
pub const ACTIVE_STATUS: &str = "active";

/// An authorization grant for one (user, area) pair.
///
/// Several grants may exist for the same pair with different windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
  pub permission_id: PermissionId,
  pub user_id:       UserId,
  pub area_id:       AreaId,
  /// Free-form clearance label, e.g. "standard" or "supervisor".
  pub access_level:  String,
  /// First day on which the grant applies (inclusive).
  pub valid_from:    NaiveDate,
  /// Last day on which the grant applies (inclusive).
  pub valid_until:   NaiveDate,
  /// Lifecycle label such as "active" or "suspended".
  pub status:        String,
}

impl Permission {
  /// Whether this single grant authorizes access on `date`.
  pub fn grants_on(&self, date: NaiveDate) -> bool {
    self.valid_from <= date
      && date <= self.valid_until
      && self.status.eq_ignore_ascii_case(ACTIVE_STATUS)
  }
}

/// A user/area pair is authorized on `date` iff at least one of its grants
/// is active and in window. No grants means no access.
pub fn is_authorized<'a, I>(permissions: I, date: NaiveDate) -> bool
where
  I: IntoIterator<Item = &'a Permission>,
{
  permissions.into_iter().any(|p| p.grants_on(date))
}
