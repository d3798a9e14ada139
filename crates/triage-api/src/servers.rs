//! Handlers for `/servers` endpoints (service points).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/servers` | Every server's current ticket |
//! | `GET`  | `/servers/:server_id/current` | 404 if the server is idle |
//! | `POST` | `/servers/:server_id/next` | Call the next ticket; 204 when the queue is empty |
//! | `POST` | `/servers/:server_id/complete` | Finish the current ticket |
//! | `POST` | `/servers/:server_id/skip` | No-show for the current ticket |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use triage_core::{Error, QueueManager, Ticket, store::QueueStore};

use crate::error::ApiError;

/// `GET /servers`
pub async fn list<S>(State(manager): State<Arc<QueueManager<S>>>) -> Json<Vec<Ticket>>
where
  S: QueueStore,
{
  Json(manager.serving().await)
}

/// `GET /servers/:server_id/current`
pub async fn current<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(server_id): Path<String>,
) -> Result<Json<Ticket>, ApiError>
where
  S: QueueStore,
{
  match manager.currently_serving(&server_id).await {
    Some(ticket) => Ok(Json(ticket)),
    None => Err(Error::NothingServing(server_id).into()),
  }
}

/// `POST /servers/:server_id/next`
pub async fn next<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(server_id): Path<String>,
) -> Result<Response, ApiError>
where
  S: QueueStore,
{
  Ok(match manager.dequeue(&server_id).await? {
    Some(ticket) => Json(ticket).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}

/// `POST /servers/:server_id/complete`
pub async fn complete<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(server_id): Path<String>,
) -> Result<Json<Ticket>, ApiError>
where
  S: QueueStore,
{
  Ok(Json(manager.complete_current_service(&server_id).await?))
}

/// `POST /servers/:server_id/skip`
pub async fn skip<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(server_id): Path<String>,
) -> Result<Json<Ticket>, ApiError>
where
  S: QueueStore,
{
  Ok(Json(manager.skip_current(&server_id).await?))
}
