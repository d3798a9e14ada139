//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The store could not be reached. The client may retry.
  #[error("store unavailable: {0}")]
  Unavailable(String),
}

impl From<triage_core::Error> for ApiError {
  fn from(err: triage_core::Error) -> Self {
    use triage_core::Error as E;

    let message = err.to_string();
    match err {
      E::Persistence(_) => {
        tracing::warn!(error = %message, "store failure surfaced to client");
        Self::Unavailable(message)
      }
      E::VisitNotFound(_) | E::NothingServing(_) => Self::NotFound(message),
      E::DuplicateVisit(_) | E::ServerBusy { .. } => Self::Conflict(message),
      E::NotWaiting { .. }
      | E::OutsideServiceDay { .. }
      | E::InvalidTransition { .. }
      | E::InvalidTicketNumber(_)
      | E::UnknownPriority(_)
      | E::UnknownStatus(_) => Self::BadRequest(message),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
