//! Handler for `POST /access/decisions`.
//!
//! Body: `{"credential":"123","areaId":1,"eventKind":"entry","note":"..."}`.
//! Always answers with a [`Decision`] once the area exists; a denial is a
//! normal `200` outcome, not an error.

use axum::{Json, extract::State};
use gatehouse_core::{
  clock::Clock,
  decision::{Decision, DecisionRequest},
  store::AccessStore,
};

use crate::{Engine, error::ApiError};

/// `POST /access/decisions`
pub async fn decide<S, C>(
  State(engine): State<Engine<S, C>>,
  Json(body): Json<DecisionRequest>,
) -> Result<Json<Decision>, ApiError>
where
  S: AccessStore,
  C: Clock,
{
  Ok(Json(engine.decide(body).await?))
}
