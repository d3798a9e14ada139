//! The `QueueStore` trait, the durable system of record for tickets.
//!
//! The trait is implemented by storage backends (e.g. `triage-store-sqlite`,
//! or [`crate::memory::MemoryStore`]). The [`crate::QueueManager`] depends on
//! this abstraction only.
//!
//! Every method may fail. `Err` means the store could not be reached or
//! rejected the request. An `Ok(false)` from an update means nothing was
//! changed: no row matched the visit id (e.g. the ticket was deleted through
//! an admin side channel), or the row is no longer in a state that allows the
//! change.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ticket::{PriorityClass, ServiceWindow, Ticket, TicketStatus};

/// Abstraction over a ticket store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait QueueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new ticket. Fails if the visit id is already stored.
  fn create_ticket(
    &self,
    ticket: Ticket,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Compare-and-set the status of a ticket from `from` to `to`.
  ///
  /// Applies only when the stored status is still `from` and `from` may
  /// move forward to `to` (see [`TicketStatus::can_transition_to`]).
  /// Stamps `completed_at` with `at` for terminal statuses and `called_at`
  /// (if unset) for `Called`/`InService`.
  fn update_status(
    &self,
    visit_id: Uuid,
    from: TicketStatus,
    to: TicketStatus,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Hand a ticket to a server in a single write: status `InService`,
  /// `assigned_server_id = server_id`, `called_at = at`. Only a `Waiting`
  /// ticket can be assigned, so two processes never take the same one.
  fn assign_server<'a>(
    &'a self,
    visit_id: Uuid,
    server_id: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Out-of-band reclassification of a ticket's priority class.
  fn update_priority(
    &self,
    visit_id: Uuid,
    priority: PriorityClass,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All `Waiting` tickets created inside `window`, in any order.
  fn find_waiting_tickets(
    &self,
    window: ServiceWindow,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + '_;

  /// The `InService` ticket assigned to `server_id`, if any.
  fn find_currently_serving<'a>(
    &'a self,
    server_id: &'a str,
  ) -> impl Future<Output = Result<Option<Ticket>, Self::Error>> + Send + 'a;

  /// Every `InService` ticket created inside `window`, across all servers.
  fn find_serving(
    &self,
    window: ServiceWindow,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + '_;

  fn find_by_visit_id(
    &self,
    visit_id: Uuid,
  ) -> impl Future<Output = Result<Option<Ticket>, Self::Error>> + Send + '_;

  /// Raw ticket codes issued inside `window`. May contain malformed values.
  fn ticket_numbers(
    &self,
    window: ServiceWindow,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Connection ────────────────────────────────────────────────────────

  /// Drop and re-establish the underlying connection.
  fn reconnect(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
