//! Error types for `triage-core`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::ticket::TicketStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// A [`QueueStore`](crate::store::QueueStore) call failed. Retryable.
  #[error("store error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("ticket not found: {0}")]
  VisitNotFound(Uuid),

  #[error("server {0:?} has no ticket in service")]
  NothingServing(String),

  #[error("ticket {visit_id} is {status}, expected waiting")]
  NotWaiting {
    visit_id: Uuid,
    status:   TicketStatus,
  },

  #[error("ticket {0} is already queued or stored")]
  DuplicateVisit(Uuid),

  #[error("ticket {visit_id} was not created on service day {day}")]
  OutsideServiceDay {
    visit_id: Uuid,
    day:      NaiveDate,
  },

  #[error("server {server:?} is already serving ticket {visit_id}")]
  ServerBusy {
    server:   String,
    visit_id: Uuid,
  },

  #[error("illegal status transition {from} -> {to}")]
  InvalidTransition {
    from: TicketStatus,
    to:   TicketStatus,
  },

  #[error("invalid ticket number: {0:?}")]
  InvalidTicketNumber(String),

  #[error("unknown priority class: {0:?}")]
  UnknownPriority(String),

  #[error("unknown ticket status: {0:?}")]
  UnknownStatus(String),
}

impl Error {
  /// Wrap a backend error as [`Error::Persistence`].
  pub fn persistence<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(err))
  }

  /// `true` for failures a caller may simply retry later.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Persistence(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
