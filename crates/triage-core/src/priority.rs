//! Service order over tickets.
//!
//! Priority class first (Emergency, then SeniorCitizen, then Regular), then
//! arrival time, then visit id so that no two distinct tickets tie.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ticket::Ticket;

/// Sort key for a waiting ticket. The derived `Ord` compares fields in
/// declaration order, which is exactly the service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriorityKey {
  pub rank:       u8,
  pub created_at: DateTime<Utc>,
  pub visit_id:   Uuid,
}

impl PriorityKey {
  pub fn of(ticket: &Ticket) -> Self {
    Self {
      rank:       ticket.priority.rank(),
      created_at: ticket.created_at,
      visit_id:   ticket.visit_id,
    }
  }
}

/// `Less` means `a` is served before `b`.
pub fn compare(a: &Ticket, b: &Ticket) -> Ordering {
  PriorityKey::of(a).cmp(&PriorityKey::of(b))
}

/// Sort `tickets` into service order in place.
pub fn sort(tickets: &mut [Ticket]) { tickets.sort_by(compare); }
