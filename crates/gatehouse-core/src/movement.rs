//! Badge movements: toggle an area's occupancy for an authorized card.
//!
//! Every precondition is checked before anything is written, and a
//! successful transition persists the new occupancy together with its audit
//! record. Refused movements leave no trace in the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
  AccessControl, Error, Result,
  area::{AreaId, AreaStatus, Movement, Occupant},
  audit::{AccessResult, NewAuditRecord},
  clock::Clock,
  credential::{normalize_credential, normalize_note},
  store::AccessStore,
};

/// A badge action against an area.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRequest {
  pub credential: String,
  pub area_id:    AreaId,
  #[serde(default)]
  pub note:       Option<String>,
}

/// The area as it stands after a successful movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResult {
  pub area_id:          AreaId,
  pub area_name:        String,
  pub movement_type:    Movement,
  pub message:          String,
  pub status:           AreaStatus,
  pub occupied:         bool,
  pub occupant_name:    Option<String>,
  pub last_movement_at: Option<DateTime<Utc>>,
  pub deadline:         Option<DateTime<Utc>>,
}

impl<S, C> AccessControl<S, C>
where
  S: AccessStore,
  C: Clock,
{
  /// Enter a free area or leave an occupied one.
  ///
  /// Fails with `InvalidInput` for a blank or unknown card or a non-positive
  /// area id, `NotFound` for a missing area, `Conflict` for an inactive area or a different occupant,
  /// and `Forbidden` when the holder has no current permission.
  #[tracing::instrument(skip(self, request), fields(area_id = request.area_id))]
  pub async fn register_movement(
    &self,
    request: MovementRequest,
  ) -> Result<MovementResult> {
    let credential = normalize_credential(&request.credential)?;
    let note = normalize_note(request.note)?;

    let (_guard, area) = self.acquire_area(request.area_id).await?;
    if !area.active {
      warn!("movement against inactive area");
      return Err(Error::Conflict(format!("area {} is inactive", area.area_id)));
    }

    let user = self
      .find_user(&credential)
      .await?
      .ok_or_else(|| Error::InvalidInput("card not recognized".into()))?;

    let now = self.now();
    if !self
      .check_permission(user.user_id, area.area_id, self.today(now))
      .await?
    {
      warn!(user_id = user.user_id, "movement without active permission");
      return Err(Error::Forbidden(
        "user holds no active permission for this area".into(),
      ));
    }

    let (movement, updated) = area
      .badge(Occupant::from_user(&user, credential.clone()), now)
      .inspect_err(|e| warn!(user_id = user.user_id, error = %e, "transition refused"))?;

    let record = NewAuditRecord {
      user_id: Some(user.user_id),
      area_id: updated.area_id,
      area_name: updated.name.clone(),
      event_kind: movement.into(),
      result: AccessResult::Authorized,
      credential,
      note,
      recorded_at: now,
    };
    self
      .store()
      .record_movement(updated.clone(), record)
      .await
      .map_err(Error::store)?;

    info!(user_id = user.user_id, ?movement, "occupancy changed");

    let view = updated.view(now, self.offset());
    let message = match movement {
      Movement::Entry => "area usage started",
      Movement::Exit => "area usage finished",
    };
    Ok(MovementResult {
      area_id:          view.area_id,
      area_name:        view.area_name,
      movement_type:    movement,
      message:          message.to_owned(),
      status:           view.status,
      occupied:         view.occupied,
      occupant_name:    view.occupant_name,
      last_movement_at: view.last_movement_at,
      deadline:         view.deadline,
    })
  }
}
