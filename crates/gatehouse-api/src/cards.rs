//! Handlers for `/cards/:credential/...` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cards/:credential/areas` | Areas the holder may enter today |
//! | `GET`  | `/cards/:credential/recommendations` | Up to five most visited areas |

use axum::{
  Json,
  extract::{Path, State},
};
use gatehouse_core::{
  area::AreaView, clock::Clock, ranking::AreaStat, store::AccessStore,
};

use crate::{Engine, error::ApiError};

/// `GET /cards/:credential/areas`
pub async fn authorized_areas<S, C>(
  State(engine): State<Engine<S, C>>,
  Path(credential): Path<String>,
) -> Result<Json<Vec<AreaView>>, ApiError>
where
  S: AccessStore,
  C: Clock,
{
  Ok(Json(engine.authorized_areas(&credential).await?))
}

/// `GET /cards/:credential/recommendations`
pub async fn recommendations<S, C>(
  State(engine): State<Engine<S, C>>,
  Path(credential): Path<String>,
) -> Result<Json<Vec<AreaStat>>, ApiError>
where
  S: AccessStore,
  C: Clock,
{
  Ok(Json(engine.recommend(&credential).await?))
}
