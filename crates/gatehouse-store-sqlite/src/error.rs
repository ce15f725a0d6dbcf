//! Error type for `gatehouse-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownLabel { column: &'static str, value: String },

  /// A row flagged occupied without a complete occupant.
  #[error("area {0} has inconsistent occupancy columns")]
  CorruptOccupancy(i64),

  #[error("area not found: {0}")]
  AreaNotFound(i64),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("permission window ends before it starts")]
  InvertedWindow,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
