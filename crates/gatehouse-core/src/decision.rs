//! Access decisions: an authorization probe that always leaves an audit
//! record, whatever the outcome. Occupancy is never touched here.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  AccessControl, Error, Result,
  area::AreaId,
  audit::{AccessResult, EventKind, NewAuditRecord},
  clock::Clock,
  credential::{normalize_credential, normalize_note},
  store::AccessStore,
  user::UserId,
};

/// A card presented at an area's reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
  pub credential: String,
  pub area_id:    AreaId,
  /// Defaults to [`EventKind::Entry`].
  #[serde(default)]
  pub event_kind: Option<EventKind>,
  #[serde(default)]
  pub note:       Option<String>,
}

/// The outcome of a decision; mirrors the audit record written for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
  pub authorized: bool,
  pub result:     AccessResult,
  pub message:    String,
  pub user_name:  Option<String>,
  pub user_id:    Option<UserId>,
  pub credential: String,
  pub area_name:  String,
}

const UNRECOGNIZED: &str = "card not recognized";
const GRANTED: &str = "access authorized for the selected area";
const REFUSED: &str = "permission not found or outside its validity window";

impl<S, C> AccessControl<S, C>
where
  S: AccessStore,
  C: Clock,
{
  /// Decide whether a card may enter an area right now.
  ///
  /// Exactly one audit record is written per call that gets past input
  /// validation and area lookup, including for unrecognized cards.
  #[tracing::instrument(skip(self, request), fields(area_id = request.area_id))]
  pub async fn decide(&self, request: DecisionRequest) -> Result<Decision> {
    let credential = normalize_credential(&request.credential)?;
    let note = normalize_note(request.note)?;
    let event_kind = request.event_kind.unwrap_or_default();

    let (_guard, area) = self.acquire_area(request.area_id).await?;
    let now = self.now();

    let user = self.find_user(&credential).await?;
    let authorized = match &user {
      Some(u) => {
        self
          .check_permission(u.user_id, area.area_id, self.today(now))
          .await?
      }
      None => false,
    };
    let result = AccessResult::from_authorized(authorized);

    self
      .store()
      .append_audit(NewAuditRecord {
        user_id: user.as_ref().map(|u| u.user_id),
        area_id: area.area_id,
        area_name: area.name.clone(),
        event_kind,
        result,
        credential: credential.clone(),
        note,
        recorded_at: now,
      })
      .await
      .map_err(Error::store)?;

    let message = match (&user, authorized) {
      (None, _) => UNRECOGNIZED,
      (Some(_), true) => GRANTED,
      (Some(_), false) => REFUSED,
    };
    info!(
      user_id = user.as_ref().map(|u| u.user_id),
      ?result,
      ?event_kind,
      "access decision"
    );

    Ok(Decision {
      authorized,
      result,
      message: message.to_owned(),
      user_name: user.as_ref().map(|u| u.name.clone()),
      user_id: user.as_ref().map(|u| u.user_id),
      credential,
      area_name: area.name,
    })
  }
}
