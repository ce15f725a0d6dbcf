//! Error types for `gatehouse-core`.

use thiserror::Error;

use crate::area::TransitionError;

/// The caller-visible category of a failed operation.
///
/// Boundary layers map these onto transport codes; the core never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  InvalidInput,
  NotFound,
  Conflict,
  Forbidden,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidInput(_) => ErrorKind::InvalidInput,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::Store(_) => ErrorKind::Internal,
    }
  }

  /// Wrap a collaborator error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

impl From<TransitionError> for Error {
  fn from(err: TransitionError) -> Self { Self::Conflict(err.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
