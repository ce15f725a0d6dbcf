//! The `AccessStore` trait: everything the core needs from persistence.
//!
//! Storage backends (e.g. `gatehouse-store-sqlite`) implement it. Users,
//! areas and permissions are managed outside the core; it only reads them,
//! apart from the occupancy fields of an area. Audit records are append-only.

use std::future::Future;

use crate::{
  area::{Area, AreaId},
  audit::{AuditQuery, AuditRecord, NewAuditRecord},
  permission::Permission,
  user::{User, UserId},
};

/// Abstraction over the external record keeper.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AccessStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Resolve a card identifier to its holder. Returns `None` if the card is
  /// not bound to anyone.
  fn find_user_by_credential<'a>(
    &'a self,
    credential: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Areas ─────────────────────────────────────────────────────────────

  /// Retrieve an area by id. Returns `None` if not found.
  fn find_area(
    &self,
    area_id: AreaId,
  ) -> impl Future<Output = Result<Option<Area>, Self::Error>> + Send + '_;

  /// List every area.
  fn list_areas(
    &self,
  ) -> impl Future<Output = Result<Vec<Area>, Self::Error>> + Send + '_;

  /// Persist the occupancy fields of `area`. Other attributes are left as
  /// stored.
  fn save_area(
    &self,
    area: Area,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Permissions ───────────────────────────────────────────────────────

  /// All permission records for a (user, area) pair, in any status.
  fn find_permissions(
    &self,
    user_id: UserId,
    area_id: AreaId,
  ) -> impl Future<Output = Result<Vec<Permission>, Self::Error>> + Send + '_;

  /// All permission records held by a user, across areas.
  fn find_user_permissions(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<Permission>, Self::Error>> + Send + '_;

  // ── Audit trail ───────────────────────────────────────────────────────

  /// Append one record and return it as persisted.
  fn append_audit(
    &self,
    record: NewAuditRecord,
  ) -> impl Future<Output = Result<AuditRecord, Self::Error>> + Send + '_;

  /// Persist an area's new occupancy and append the audit record describing
  /// the transition, atomically: either both writes land or neither does.
  fn record_movement(
    &self,
    area: Area,
    record: NewAuditRecord,
  ) -> impl Future<Output = Result<AuditRecord, Self::Error>> + Send + '_;

  /// Every record for a user, most recent first.
  fn audit_history(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<AuditRecord>, Self::Error>> + Send + '_;

  /// Records matching `query`, most recent first.
  fn search_audit<'a>(
    &'a self,
    query: &'a AuditQuery,
  ) -> impl Future<Output = Result<Vec<AuditRecord>, Self::Error>> + Send + 'a;
}
