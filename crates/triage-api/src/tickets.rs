//! Handlers for `/tickets` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/tickets` | Body: `{"priority":"regular","subject_ref":"..."}`; returns 201 |
//! | `GET`  | `/tickets/:visit_id` | Stored ticket plus its live `position`, if waiting |
//! | `POST` | `/tickets/:visit_id/reclassify` | Body: `{"priority":"emergency"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use triage_core::{NewTicket, PriorityClass, QueueManager, Ticket, store::QueueStore};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Issue ────────────────────────────────────────────────────────────────────

/// `POST /tickets`
pub async fn issue<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Json(body): Json<NewTicket>,
) -> Result<impl IntoResponse, ApiError>
where
  S: QueueStore,
{
  let ticket = manager.issue(body).await?;
  Ok((StatusCode::CREATED, Json(ticket)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TicketView {
  #[serde(flatten)]
  pub ticket:   Ticket,
  /// 1-based place in line; absent once the ticket has left the queue.
  pub position: Option<usize>,
}

/// `GET /tickets/:visit_id`
pub async fn get_one<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(visit_id): Path<Uuid>,
) -> Result<Json<TicketView>, ApiError>
where
  S: QueueStore,
{
  let ticket = manager
    .find(visit_id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("ticket {visit_id} not found")))?;
  let position = manager.position(visit_id).await;
  Ok(Json(TicketView { ticket, position }))
}

// ─── Reclassify ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReclassifyBody {
  pub priority: PriorityClass,
}

/// `POST /tickets/:visit_id/reclassify`
pub async fn reclassify<S>(
  State(manager): State<Arc<QueueManager<S>>>,
  Path(visit_id): Path<Uuid>,
  Json(body): Json<ReclassifyBody>,
) -> Result<Json<Ticket>, ApiError>
where
  S: QueueStore,
{
  Ok(Json(manager.reclassify(visit_id, body.priority).await?))
}
