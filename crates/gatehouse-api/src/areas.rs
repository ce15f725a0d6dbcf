//! Handlers for `/areas` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/areas/movements` | Body: `{"credential":"123","areaId":1,"note":"..."}` |
//! | `GET`  | `/areas` | Status view of every area |
//! | `GET`  | `/areas/:id` | Current status view; 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
};
use gatehouse_core::{
  area::{AreaId, AreaView},
  clock::Clock,
  movement::{MovementRequest, MovementResult},
  store::AccessStore,
};

use crate::{Engine, error::ApiError};

// ─── Movement ─────────────────────────────────────────────────────────────────

/// `POST /areas/movements`: enter a free area or leave an occupied one.
pub async fn movement<S, C>(
  State(engine): State<Engine<S, C>>,
  Json(body): Json<MovementRequest>,
) -> Result<Json<MovementResult>, ApiError>
where
  S: AccessStore,
  C: Clock,
{
  Ok(Json(engine.register_movement(body).await?))
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// `GET /areas`
pub async fn list<S, C>(
  State(engine): State<Engine<S, C>>,
) -> Result<Json<Vec<AreaView>>, ApiError>
where
  S: AccessStore,
  C: Clock,
{
  Ok(Json(engine.list_areas().await?))
}

/// `GET /areas/:id`
pub async fn status<S, C>(
  State(engine): State<Engine<S, C>>,
  Path(id): Path<AreaId>,
) -> Result<Json<AreaView>, ApiError>
where
  S: AccessStore,
  C: Clock,
{
  Ok(Json(engine.area_status(id).await?))
}
