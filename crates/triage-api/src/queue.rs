//! Handlers for `/queue` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/queue` | Optional `?limit=N`; waiting tickets in service order |
//! | `GET`    | `/queue/next` | 204 when nothing is waiting |
//! | `GET`    | `/queue/:visit_id/position` | 404 if not waiting |
//! | `DELETE` | `/queue/:visit_id` | Marks a waiting ticket skipped |
//! | `POST`   | `/queue/sync` | Rebuild from the store |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use triage_core::{QueueManager, Removal, SyncReport, Ticket, store::QueueStore};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /queue[?limit=N]`
pub async fn list<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<Ticket>>
where
  S: QueueStore,
{
  Json(manager.waiting(params.limit).await)
}

// ─── Peek ─────────────────────────────────────────────────────────────────────

/// `GET /queue/next`
pub async fn next<S>(State(manager): State<Arc<QueueManager<S>>>) -> Response
where
  S: QueueStore,
{
  match manager.peek().await {
    Some(ticket) => Json(ticket).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  }
}

// ─── Position ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Position {
  pub visit_id: Uuid,
  pub position: usize,
  pub waiting:  usize,
}

/// `GET /queue/:visit_id/position`
pub async fn position<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(visit_id): Path<Uuid>,
) -> Result<Json<Position>, ApiError>
where
  S: QueueStore,
{
  let (position, waiting) = manager
    .place_in_line(visit_id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("ticket {visit_id} is not waiting")))?;
  Ok(Json(Position { visit_id, position, waiting }))
}

// ─── Remove ───────────────────────────────────────────────────────────────────

/// `DELETE /queue/:visit_id`
pub async fn remove<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(visit_id): Path<Uuid>,
) -> Result<Json<Removal>, ApiError>
where
  S: QueueStore,
{
  Ok(Json(manager.remove_from_queue(visit_id).await?))
}

// ─── Sync ─────────────────────────────────────────────────────────────────────

/// `POST /queue/sync`
pub async fn sync<S>(
  State(manager): State<Arc<QueueManager<S>>>,
) -> Result<Json<SyncReport>, ApiError>
where
  S: QueueStore,
{
  Ok(Json(manager.sync().await?))
}
