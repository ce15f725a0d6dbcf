//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gatehouse_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Engine(#[from] gatehouse_core::Error),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Engine(e) => match e.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let message = match &self {
      ApiError::BadRequest(m) => m.clone(),
      ApiError::Engine(e) => e.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
