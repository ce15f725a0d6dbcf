//! [`SqliteStore`], the SQLite implementation of [`AccessStore`].

use std::path::Path;

use gatehouse_core::{
  area::{Area, AreaId},
  audit::{AuditQuery, AuditRecord, NewAuditRecord},
  permission::Permission,
  store::AccessStore,
  user::{User, UserId},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    AREA_COLUMNS, AUDIT_COLUMNS, OccupancyColumns, PERMISSION_COLUMNS, RawArea,
    RawAuditRecord, RawPermission, USER_COLUMNS, encode_dt, encode_event_kind,
    encode_result, encode_uuid, read_user,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Gatehouse store backed by a single SQLite file.
///
/// Clones share one background connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_permissions(
    &self,
    user_id: UserId,
    area_id: Option<AreaId>,
  ) -> Result<Vec<Permission>> {
    let raws: Vec<RawPermission> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {PERMISSION_COLUMNS} FROM permissions
           WHERE user_id = ?1 AND (?2 IS NULL OR area_id = ?2)
           ORDER BY permission_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, area_id], RawPermission::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPermission::into_permission).collect()
  }
}

/// Bind an audit record's columns and insert it.
fn insert_audit(conn: &rusqlite::Connection, record: &AuditRecord) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO audit_records (
       record_id, user_id, area_id, area_name, event_kind,
       result, credential, note, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      encode_uuid(record.record_id),
      record.user_id,
      record.area_id,
      record.area_name,
      encode_event_kind(record.event_kind),
      encode_result(record.result),
      record.credential,
      record.note,
      encode_dt(record.recorded_at),
    ],
  )?;
  Ok(())
}

/// Write the occupancy columns of `area_id`; returns the number of rows hit.
fn update_occupancy(
  conn: &rusqlite::Connection,
  area_id: AreaId,
  cols: &OccupancyColumns,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE areas
     SET occupied = ?1, occupant_name = ?2, occupant_credential = ?3,
         occupant_user_id = ?4, last_movement_at = ?5
     WHERE area_id = ?6",
    rusqlite::params![
      cols.occupied,
      cols.occupant_name,
      cols.occupant_credential,
      cols.occupant_user_id,
      cols.last_movement_at,
      area_id,
    ],
  )
}

// ─── AccessStore impl ────────────────────────────────────────────────────────

impl AccessStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn find_user_by_credential(&self, credential: &str) -> Result<Option<User>> {
    let credential = credential.to_owned();

    let user = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE credential = ?1"),
            rusqlite::params![credential],
            read_user,
          )
          .optional()?)
      })
      .await?;

    Ok(user)
  }

  // ── Areas ─────────────────────────────────────────────────────────────────

  async fn find_area(&self, area_id: AreaId) -> Result<Option<Area>> {
    let raw: Option<RawArea> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {AREA_COLUMNS} FROM areas WHERE area_id = ?1"),
            rusqlite::params![area_id],
            RawArea::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawArea::into_area).transpose()
  }

  async fn list_areas(&self) -> Result<Vec<Area>> {
    let raws: Vec<RawArea> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {AREA_COLUMNS} FROM areas ORDER BY area_id"))?;
        let rows = stmt
          .query_map([], RawArea::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArea::into_area).collect()
  }

  async fn save_area(&self, area: Area) -> Result<()> {
    let cols = OccupancyColumns::from(&area.occupancy);
    let area_id = area.area_id;

    let updated = self
      .conn
      .call(move |conn| Ok(update_occupancy(conn, area_id, &cols)?))
      .await?;

    if updated == 0 {
      return Err(Error::AreaNotFound(area_id));
    }
    Ok(())
  }

  // ── Permissions ───────────────────────────────────────────────────────────

  async fn find_permissions(
    &self,
    user_id: UserId,
    area_id: AreaId,
  ) -> Result<Vec<Permission>> {
    self.query_permissions(user_id, Some(area_id)).await
  }

  async fn find_user_permissions(&self, user_id: UserId) -> Result<Vec<Permission>> {
    self.query_permissions(user_id, None).await
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  async fn append_audit(&self, record: NewAuditRecord) -> Result<AuditRecord> {
    let record = record.into_record(Uuid::new_v4());
    let row = record.clone();

    self
      .conn
      .call(move |conn| Ok(insert_audit(conn, &row)?))
      .await?;

    Ok(record)
  }

  async fn record_movement(
    &self,
    area: Area,
    record: NewAuditRecord,
  ) -> Result<AuditRecord> {
    let record = record.into_record(Uuid::new_v4());
    let row = record.clone();
    let cols = OccupancyColumns::from(&area.occupancy);
    let area_id = area.area_id;

    let committed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if update_occupancy(&tx, area_id, &cols)? == 0 {
          // Dropping the transaction rolls it back.
          return Ok(false);
        }
        insert_audit(&tx, &row)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !committed {
      return Err(Error::AreaNotFound(area_id));
    }
    Ok(record)
  }

  async fn audit_history(&self, user_id: UserId) -> Result<Vec<AuditRecord>> {
    let query = AuditQuery { user_id: Some(user_id), ..AuditQuery::default() };
    self.search_audit(&query).await
  }

  async fn search_audit(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>> {
    let user_id = query.user_id;
    let area_id = query.area_id;
    let after = query.recorded_after.map(encode_dt);
    let before = query.recorded_before.map(encode_dt);
    // SQLite treats a negative LIMIT as "no limit".
    let limit = query.limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawAuditRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {AUDIT_COLUMNS} FROM audit_records
           WHERE (?1 IS NULL OR user_id = ?1)
             AND (?2 IS NULL OR area_id = ?2)
             AND (?3 IS NULL OR recorded_at >= ?3)
             AND (?4 IS NULL OR recorded_at <= ?4)
           ORDER BY recorded_at DESC, rowid DESC
           LIMIT ?5"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_id, area_id, after, before, limit],
            RawAuditRecord::read,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditRecord::into_record).collect()
  }
}
