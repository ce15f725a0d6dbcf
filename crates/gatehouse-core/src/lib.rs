//! Core types, rules and services for the Gatehouse access-control engine.
//!
//! Users, areas, permissions and the audit trail are reached through the
//! [`store::AccessStore`] trait. Nothing here speaks HTTP or SQL.

pub mod area;
pub mod audit;
pub mod clock;
pub mod credential;
pub mod decision;
pub mod error;
pub mod movement;
pub mod permission;
pub mod ranking;
pub mod service;
pub mod store;
pub mod user;

pub use error::{Error, ErrorKind, Result};
pub use service::AccessControl;
