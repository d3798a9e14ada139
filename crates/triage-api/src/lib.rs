//! JSON REST API for Triage.
//!
//! Exposes an axum [`Router`] backed by a shared [`QueueManager`] over any
//! [`triage_core::store::QueueStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", triage_api::api_router(manager.clone()))
//! ```

pub mod error;
pub mod queue;
pub mod servers;
pub mod tickets;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use triage_core::{QueueManager, store::QueueStore};

pub use error::ApiError;

/// Build the API router for `manager`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(manager: Arc<QueueManager<S>>) -> Router<()>
where
  S: QueueStore + 'static,
{
  Router::new()
    // Intake
    .route("/tickets", post(tickets::issue::<S>))
    .route("/tickets/{visit_id}", get(tickets::get_one::<S>))
    .route("/tickets/{visit_id}/reclassify", post(tickets::reclassify::<S>))
    // Waiting line
    .route("/queue", get(queue::list::<S>))
    .route("/queue/next", get(queue::next::<S>))
    .route("/queue/sync", post(queue::sync::<S>))
    .route("/queue/{visit_id}", delete(queue::remove::<S>))
    .route("/queue/{visit_id}/position", get(queue::position::<S>))
    // Service points
    .route("/servers", get(servers::list::<S>))
    .route("/servers/{server_id}/current", get(servers::current::<S>))
    .route("/servers/{server_id}/next", post(servers::next::<S>))
    .route("/servers/{server_id}/complete", post(servers::complete::<S>))
    .route("/servers/{server_id}/skip", post(servers::skip::<S>))
    .with_state(manager)
}
