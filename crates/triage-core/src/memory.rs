//! In-process [`QueueStore`] backed by a hash map.
//!
//! Used by tests and by embedders that do not need durability. It can also
//! simulate the failures a real backend exhibits: injected one-shot errors per
//! operation, a dropped connection that [`QueueStore::reconnect`] repairs, and
//! an outage that it does not.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  store::QueueStore,
  ticket::{PriorityClass, ServiceWindow, Ticket, TicketStatus},
};

/// Store operations, for targeting injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
  CreateTicket,
  UpdateStatus,
  AssignServer,
  UpdatePriority,
  FindWaiting,
  FindCurrentlyServing,
  FindServing,
  FindByVisitId,
  TicketNumbers,
}

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  #[error("store unreachable")]
  Unreachable,

  #[error("connection lost")]
  Disconnected,

  #[error("injected failure in {0:?}")]
  Injected(StoreOp),

  #[error("visit id already stored: {0}")]
  Duplicate(Uuid),
}

#[derive(Debug, Default)]
struct Inner {
  tickets:      HashMap<Uuid, Ticket>,
  failures:     HashMap<StoreOp, u32>,
  disconnected: bool,
  unreachable:  bool,
  reconnects:   u32,
}

impl Inner {
  fn check(&mut self, op: StoreOp) -> Result<(), MemoryStoreError> {
    if self.unreachable {
      return Err(MemoryStoreError::Unreachable);
    }
    if self.disconnected {
      return Err(MemoryStoreError::Disconnected);
    }
    if let Some(n) = self.failures.get_mut(&op)
      && *n > 0
    {
      *n -= 1;
      return Err(MemoryStoreError::Injected(op));
    }
    Ok(())
  }

  fn in_window(
    &self,
    window: ServiceWindow,
    status: TicketStatus,
  ) -> Vec<Ticket> {
    self
      .tickets
      .values()
      .filter(|t| t.status == status && window.contains(t.created_at))
      .cloned()
      .collect()
  }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Make the next `times` calls of `op` fail.
  pub fn fail_next(&self, op: StoreOp, times: u32) {
    *self.lock().failures.entry(op).or_default() += times;
  }

  /// Drop the connection: every call fails until `reconnect` succeeds.
  pub fn disconnect(&self) { self.lock().disconnected = true; }

  /// Simulate an outage that reconnecting cannot fix.
  pub fn set_unreachable(&self, unreachable: bool) {
    self.lock().unreachable = unreachable;
  }

  pub fn reconnect_count(&self) -> u32 { self.lock().reconnects }

  /// Write a ticket directly, bypassing any manager. Replaces an existing
  /// ticket with the same visit id.
  pub fn put(&self, ticket: Ticket) {
    self.lock().tickets.insert(ticket.visit_id, ticket);
  }

  /// Administrative hard delete.
  pub fn delete(&self, visit_id: Uuid) -> bool {
    self.lock().tickets.remove(&visit_id).is_some()
  }

  pub fn get(&self, visit_id: Uuid) -> Option<Ticket> {
    self.lock().tickets.get(&visit_id).cloned()
  }

  pub fn len(&self) -> usize { self.lock().tickets.len() }

  pub fn is_empty(&self) -> bool { self.lock().tickets.is_empty() }
}

impl QueueStore for MemoryStore {
  type Error = MemoryStoreError;

  async fn create_ticket(&self, ticket: Ticket) -> Result<(), MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::CreateTicket)?;
    if inner.tickets.contains_key(&ticket.visit_id) {
      return Err(MemoryStoreError::Duplicate(ticket.visit_id));
    }
    inner.tickets.insert(ticket.visit_id, ticket);
    Ok(())
  }

  async fn update_status(
    &self,
    visit_id: Uuid,
    from: TicketStatus,
    to: TicketStatus,
    at: DateTime<Utc>,
  ) -> Result<bool, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::UpdateStatus)?;
    let Some(ticket) = inner.tickets.get_mut(&visit_id) else {
      return Ok(false);
    };
    if ticket.status != from {
      return Ok(false);
    }
    Ok(ticket.advance(to, at).is_ok())
  }

  async fn assign_server(
    &self,
    visit_id: Uuid,
    server_id: &str,
    at: DateTime<Utc>,
  ) -> Result<bool, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::AssignServer)?;
    let Some(ticket) = inner.tickets.get_mut(&visit_id) else {
      return Ok(false);
    };
    if ticket.status != TicketStatus::Waiting {
      return Ok(false);
    }
    Ok(ticket.assign(server_id, at).is_ok())
  }

  async fn update_priority(
    &self,
    visit_id: Uuid,
    priority: PriorityClass,
  ) -> Result<bool, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::UpdatePriority)?;
    let Some(ticket) = inner.tickets.get_mut(&visit_id) else {
      return Ok(false);
    };
    ticket.priority = priority;
    Ok(true)
  }

  async fn find_waiting_tickets(
    &self,
    window: ServiceWindow,
  ) -> Result<Vec<Ticket>, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::FindWaiting)?;
    Ok(inner.in_window(window, TicketStatus::Waiting))
  }

  async fn find_currently_serving(
    &self,
    server_id: &str,
  ) -> Result<Option<Ticket>, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::FindCurrentlyServing)?;
    Ok(
      inner
        .tickets
        .values()
        .filter(|t| {
          t.status == TicketStatus::InService
            && t.assigned_server_id.as_deref() == Some(server_id)
        })
        .max_by_key(|t| t.called_at)
        .cloned(),
    )
  }

  async fn find_serving(
    &self,
    window: ServiceWindow,
  ) -> Result<Vec<Ticket>, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::FindServing)?;
    Ok(inner.in_window(window, TicketStatus::InService))
  }

  async fn find_by_visit_id(
    &self,
    visit_id: Uuid,
  ) -> Result<Option<Ticket>, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::FindByVisitId)?;
    Ok(inner.tickets.get(&visit_id).cloned())
  }

  async fn ticket_numbers(
    &self,
    window: ServiceWindow,
  ) -> Result<Vec<String>, MemoryStoreError> {
    let mut inner = self.lock();
    inner.check(StoreOp::TicketNumbers)?;
    Ok(
      inner
        .tickets
        .values()
        .filter(|t| window.contains(t.created_at))
        .map(|t| t.ticket_number.to_string())
        .collect(),
    )
  }

  async fn reconnect(&self) -> Result<(), MemoryStoreError> {
    let mut inner = self.lock();
    inner.reconnects += 1;
    if inner.unreachable {
      return Err(MemoryStoreError::Unreachable);
    }
    inner.disconnected = false;
    Ok(())
  }
}
