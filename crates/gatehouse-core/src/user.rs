//! Card holders, as resolved from a presented credential.

use serde::{Deserialize, Serialize};

/// Identifier of a card holder.
pub type UserId = i64;

/// A card holder. Managed externally; the core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub user_id:    UserId,
  /// Display name, copied onto an area while the user occupies it.
  pub name:       String,
  /// The card identifier bound to this user.
  pub credential: String,
}
