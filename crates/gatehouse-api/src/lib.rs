//! JSON REST API for Gatehouse.
//!
//! Exposes an axum [`Router`] backed by an [`AccessControl`] engine over any
//! [`AccessStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gatehouse_api::api_router(engine.clone()))
//! ```

pub mod access;
pub mod areas;
pub mod cards;
pub mod error;
pub mod history;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use gatehouse_core::{AccessControl, clock::Clock, store::AccessStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared engine handle threaded through every handler.
pub type Engine<S, C> = Arc<AccessControl<S, C>>;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(engine: Engine<S, C>) -> Router<()>
where
  S: AccessStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    // Badge events
    .route("/access/decisions", post(access::decide::<S, C>))
    .route("/areas/movements", post(areas::movement::<S, C>))
    // Reads
    .route("/areas", get(areas::list::<S, C>))
    .route("/areas/{id}", get(areas::status::<S, C>))
    .route("/cards/{credential}/areas", get(cards::authorized_areas::<S, C>))
    .route("/cards/{credential}/recommendations", get(cards::recommendations::<S, C>))
    .route("/history", get(history::list::<S, C>))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}
