//! Management writes: creating the users, areas and permission grants that
//! the engine reads.
//!
//! These stand in for the administrative side of an access-control
//! deployment and are used to seed a store from fixtures and in tests.

use chrono::NaiveDate;
use gatehouse_core::{
  area::{Area, AreaId, Occupancy},
  permission::Permission,
  user::{User, UserId},
};
use rusqlite::OptionalExtension as _;
use serde::Deserialize;

use crate::{
  Error, Result,
  encode::encode_date,
  store::SqliteStore,
};

/// Input to [`SqliteStore::add_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub name:       String,
  pub credential: String,
}

/// Input to [`SqliteStore::add_area`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewArea {
  pub name:   String,
  #[serde(default = "default_active")]
  pub active: bool,
}

fn default_active() -> bool { true }

/// Input to [`SqliteStore::grant_permission`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPermission {
  pub user_id:      UserId,
  pub area_id:      AreaId,
  pub access_level: String,
  pub valid_from:   NaiveDate,
  pub valid_until:  NaiveDate,
  pub status:       String,
}

impl SqliteStore {
  /// Register a card holder. Card identifiers are unique.
  pub async fn add_user(&self, input: NewUser) -> Result<User> {
    let NewUser { name, credential } = input;
    let (n, c) = (name.clone(), credential.clone());

    let user_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (name, credential) VALUES (?1, ?2)",
          rusqlite::params![n, c],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(user_id, "user added");
    Ok(User { user_id, name, credential })
  }

  /// Create a free area.
  pub async fn add_area(&self, input: NewArea) -> Result<Area> {
    let NewArea { name, active } = input;
    let n = name.clone();

    let area_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO areas (name, active) VALUES (?1, ?2)",
          rusqlite::params![n, active],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(area_id, "area added");
    Ok(Area { area_id, name, active, occupancy: Occupancy::default() })
  }

  /// Switch an area between active and inactive. Occupancy is untouched.
  pub async fn set_area_active(&self, area_id: AreaId, active: bool) -> Result<()> {
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE areas SET active = ?1 WHERE area_id = ?2",
          rusqlite::params![active, area_id],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::AreaNotFound(area_id));
    }
    Ok(())
  }

  /// Grant a user access to an area for an inclusive date window.
  pub async fn grant_permission(&self, input: NewPermission) -> Result<Permission> {
    if input.valid_until < input.valid_from {
      return Err(Error::InvertedWindow);
    }
    let (user_id, area_id) = (input.user_id, input.area_id);
    let (level, status) = (input.access_level.clone(), input.status.clone());
    let (from, until) = (encode_date(input.valid_from), encode_date(input.valid_until));

    let permission_id = self
      .conn
      .call(move |conn| {
        let user_exists = conn
          .query_row("SELECT 1 FROM users WHERE user_id = ?1", [user_id], |_| Ok(()))
          .optional()?
          .is_some();
        if !user_exists {
          return Ok(Err(Error::UserNotFound(user_id)));
        }
        let area_exists = conn
          .query_row("SELECT 1 FROM areas WHERE area_id = ?1", [area_id], |_| Ok(()))
          .optional()?
          .is_some();
        if !area_exists {
          return Ok(Err(Error::AreaNotFound(area_id)));
        }

        conn.execute(
          "INSERT INTO permissions
             (user_id, area_id, access_level, valid_from, valid_until, status)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![user_id, area_id, level, from, until, status],
        )?;
        Ok(Ok(conn.last_insert_rowid()))
      })
      .await??;

    Ok(Permission {
      permission_id,
      user_id,
      area_id,
      access_level: input.access_level,
      valid_from: input.valid_from,
      valid_until: input.valid_until,
      status: input.status,
    })
  }
}
