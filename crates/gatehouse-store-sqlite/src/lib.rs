//! SQLite backend for the Gatehouse access-control engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod manage;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use manage::{NewArea, NewPermission, NewUser};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
