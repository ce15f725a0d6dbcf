//! Handler for `GET /history`.
//!
//! Query params map directly to [`AuditQuery`] fields.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Utc};
use gatehouse_core::{
  area::AreaId,
  audit::{AuditQuery, AuditRecord},
  clock::Clock,
  store::AccessStore,
  user::UserId,
};
use serde::Deserialize;

use crate::{Engine, error::ApiError};

/// Hard ceiling on records returned by one request.
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
  pub user_id: Option<UserId>,
  pub area_id: Option<AreaId>,
  /// Inclusive lower bound on `recorded_at`.
  pub from:    Option<DateTime<Utc>>,
  /// Inclusive upper bound on `recorded_at`.
  pub to:      Option<DateTime<Utc>>,
  pub limit:   Option<usize>,
}

/// `GET /history[?user_id=...][&area_id=...][&from=...][&to=...][&limit=...]`
pub async fn list<S, C>(
  State(engine): State<Engine<S, C>>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<AuditRecord>>, ApiError>
where
  S: AccessStore,
  C: Clock,
{
  if params.limit == Some(0) {
    return Err(ApiError::BadRequest("limit must be positive".into()));
  }
  let query = AuditQuery {
    user_id:         params.user_id,
    area_id:         params.area_id,
    recorded_after:  params.from,
    recorded_before: params.to,
    limit:           Some(params.limit.unwrap_or(MAX_LIMIT).min(MAX_LIMIT)),
  };
  Ok(Json(engine.history(&query).await?))
}
