//! [`QueueManager`]: the live queue and its reconciliation with the store.
//!
//! The manager owns two views of the queue: the in-memory [`LiveIndex`] of
//! waiting tickets plus a per-server "currently serving" map, and the durable
//! [`QueueStore`]. Every public operation runs under one async mutex, held
//! across the store call, so operations never interleave. Mutations write to
//! the store first and only touch memory once the write has succeeded; on a
//! store failure memory is left (or put back) exactly as it was.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  index::LiveIndex,
  store::QueueStore,
  ticket::{NewTicket, PriorityClass, ServiceWindow, Ticket, TicketStatus},
  ticket_number::next_ticket_number,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
  /// Offset of the local service day from UTC, in minutes (e.g. `480` for
  /// UTC+08:00). Decides where one day's ticket numbers end.
  pub utc_offset_minutes: i32,
}

impl QueueConfig {
  /// Out-of-range offsets fall back to UTC.
  pub fn offset(&self) -> FixedOffset {
    FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
      .unwrap_or_else(|| Utc.fix())
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Outcome of a successful [`QueueManager::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub day:     chrono::NaiveDate,
  pub waiting: usize,
  pub serving: usize,
}

/// Outcome of [`QueueManager::remove_from_queue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "ticket", rename_all = "snake_case")]
pub enum Removal {
  /// The ticket was waiting and is now `Skipped`.
  Removed(Ticket),
  /// Nothing waiting under that visit id: already served, removed, or
  /// deleted. Not an error.
  AlreadyResolved,
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct QueueState {
  index:   LiveIndex,
  /// Server id → the ticket that server is handling.
  serving: HashMap<String, Ticket>,
}

impl QueueState {
  fn knows(&self, visit_id: Uuid) -> bool {
    self.index.contains(visit_id)
      || self.serving.values().any(|t| t.visit_id == visit_id)
  }
}

// ─── Manager ─────────────────────────────────────────────────────────────────

/// The queue engine. Construct one per store and share it behind an `Arc`.
pub struct QueueManager<S> {
  store:  S,
  config: QueueConfig,
  state:  Mutex<QueueState>,
}

impl<S: QueueStore> QueueManager<S> {
  /// An empty manager. Call [`sync`](Self::sync) to load the store's state.
  pub fn new(store: S, config: QueueConfig) -> Self {
    Self { store, config, state: Mutex::new(QueueState::default()) }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &QueueConfig { &self.config }

  /// The service day containing `at`.
  pub fn service_window(&self, at: DateTime<Utc>) -> ServiceWindow {
    ServiceWindow::containing(at, self.config.offset())
  }

  async fn lock(&self) -> MutexGuard<'_, QueueState> { self.state.lock().await }

  // ── Intake ────────────────────────────────────────────────────────────

  /// Persist a caller-built `Waiting` ticket, then queue it.
  ///
  /// The ticket must have been created during the current service day and
  /// its visit id must be new to both memory and the store. On error the
  /// ticket exists neither in memory nor (as far as this manager knows) in
  /// the store.
  pub async fn enqueue(&self, ticket: Ticket) -> Result<()> {
    let mut state = self.lock().await;
    let window = self.service_window(Utc::now());
    self.enqueue_locked(&mut state, window, ticket).await
  }

  /// Assign the day's next ticket number to `input` and enqueue it.
  pub async fn issue(&self, input: NewTicket) -> Result<Ticket> {
    let mut state = self.lock().await;
    let now = Utc::now();
    let window = self.service_window(now);

    let issued = self
      .store
      .ticket_numbers(window)
      .await
      .map_err(Error::persistence)?;
    let number = next_ticket_number(issued.iter().map(String::as_str));

    let ticket = Ticket::new(number, input.priority, input.subject_ref, now);
    self.enqueue_locked(&mut state, window, ticket.clone()).await?;
    Ok(ticket)
  }

  async fn enqueue_locked(
    &self,
    state: &mut QueueState,
    window: ServiceWindow,
    ticket: Ticket,
  ) -> Result<()> {
    if ticket.status != TicketStatus::Waiting {
      return Err(Error::NotWaiting {
        visit_id: ticket.visit_id,
        status:   ticket.status,
      });
    }
    // `sync` only loads the current day, so anything else would vanish.
    if !window.contains(ticket.created_at) {
      return Err(Error::OutsideServiceDay {
        visit_id: ticket.visit_id,
        day:      window.day,
      });
    }
    if state.knows(ticket.visit_id) {
      return Err(Error::DuplicateVisit(ticket.visit_id));
    }

    let stored = self
      .store
      .find_by_visit_id(ticket.visit_id)
      .await
      .map_err(|e| {
        error!(visit_id = %ticket.visit_id, error = %e, "failed to check for existing ticket");
        Error::persistence(e)
      })?;
    if let Some(existing) = stored {
      warn!(
        visit_id = %ticket.visit_id,
        status = %existing.status,
        "visit id already in store"
      );
      return Err(Error::DuplicateVisit(ticket.visit_id));
    }

    if let Err(e) = self.store.create_ticket(ticket.clone()).await {
      error!(
        visit_id = %ticket.visit_id,
        ticket = %ticket.ticket_number,
        error = %e,
        "failed to persist ticket"
      );
      return Err(Error::persistence(e));
    }

    info!(
      visit_id = %ticket.visit_id,
      ticket = %ticket.ticket_number,
      priority = %ticket.priority,
      waiting = state.index.len() + 1,
      "enqueued ticket"
    );
    state.index.insert(ticket);
    Ok(())
  }

  // ── Service points ────────────────────────────────────────────────────

  /// Hand the highest-priority waiting ticket to `server_id`.
  ///
  /// Returns `Ok(None)` when nothing is waiting. If the assignment cannot be
  /// persisted the ticket goes back into the queue at its old position.
  pub async fn dequeue(&self, server_id: &str) -> Result<Option<Ticket>> {
    let mut state = self.lock().await;

    if state.index.is_empty() {
      debug!(server = server_id, "queue is empty, nothing to dequeue");
      return Ok(None);
    }
    if let Some(current) = state.serving.get(server_id) {
      return Err(Error::ServerBusy {
        server:   server_id.to_owned(),
        visit_id: current.visit_id,
      });
    }

    while let Some(ticket) = state.index.pop() {
      let now = Utc::now();
      let mut called = ticket.clone();
      if let Err(e) = called.assign(server_id, now) {
        state.index.insert(ticket);
        return Err(e);
      }

      match self.store.assign_server(ticket.visit_id, server_id, now).await {
        Ok(true) => {
          state.serving.insert(server_id.to_owned(), called.clone());
          info!(
            visit_id = %called.visit_id,
            ticket = %called.ticket_number,
            server = server_id,
            waiting = state.index.len(),
            "dequeued ticket"
          );
          return Ok(Some(called));
        }
        Ok(false) => {
          // Deleted, or taken by another process sharing the store.
          warn!(
            visit_id = %ticket.visit_id,
            ticket = %ticket.ticket_number,
            "ticket no longer waiting in store, dropping from queue"
          );
        }
        Err(e) => {
          error!(
            visit_id = %ticket.visit_id,
            ticket = %ticket.ticket_number,
            server = server_id,
            error = %e,
            "failed to persist assignment, requeueing"
          );
          state.index.insert(ticket);
          return Err(Error::persistence(e));
        }
      }
    }

    Ok(None)
  }

  /// Mark the ticket `server_id` is handling as `Completed`.
  pub async fn complete_current_service(&self, server_id: &str) -> Result<Ticket> {
    self.finish_current(server_id, TicketStatus::Completed).await
  }

  /// Mark the ticket `server_id` is handling as `Skipped` (no-show).
  pub async fn skip_current(&self, server_id: &str) -> Result<Ticket> {
    self.finish_current(server_id, TicketStatus::Skipped).await
  }

  async fn finish_current(
    &self,
    server_id: &str,
    status: TicketStatus,
  ) -> Result<Ticket> {
    let mut state = self.lock().await;

    let Some(current) = state.serving.get(server_id).cloned() else {
      warn!(server = server_id, "no ticket currently being served");
      return Err(Error::NothingServing(server_id.to_owned()));
    };

    let now = Utc::now();
    let mut done = current.clone();
    done.advance(status, now)?;

    match self
      .store
      .update_status(current.visit_id, current.status, status, now)
      .await
    {
      Ok(true) => {
        state.serving.remove(server_id);
        info!(
          visit_id = %done.visit_id,
          ticket = %done.ticket_number,
          server = server_id,
          %status,
          "finished ticket"
        );
        Ok(done)
      }
      Ok(false) => {
        state.serving.remove(server_id);
        warn!(
          visit_id = %current.visit_id,
          server = server_id,
          "serving ticket missing or already finished in store, clearing pointer"
        );
        Err(Error::VisitNotFound(current.visit_id))
      }
      Err(e) => {
        error!(
          visit_id = %current.visit_id,
          server = server_id,
          %status,
          error = %e,
          "failed to persist status"
        );
        Err(Error::persistence(e))
      }
    }
  }

  // ── Administration ────────────────────────────────────────────────────

  /// Take a waiting ticket out of the queue, recording it as `Skipped`.
  pub async fn remove_from_queue(&self, visit_id: Uuid) -> Result<Removal> {
    let mut state = self.lock().await;

    let cached = state.index.get(visit_id).cloned();
    let candidate = match cached {
      Some(t) => Some(t),
      // The index may be stale after a failed sync; ask the store.
      None => self
        .store
        .find_by_visit_id(visit_id)
        .await
        .map_err(Error::persistence)?
        .filter(|t| t.status == TicketStatus::Waiting),
    };
    let Some(ticket) = candidate else {
      debug!(%visit_id, "ticket not waiting, nothing to remove");
      return Ok(Removal::AlreadyResolved);
    };

    let now = Utc::now();
    let mut removed = ticket.clone();
    removed.advance(TicketStatus::Skipped, now)?;

    // Only a row still waiting is skipped; one a server has taken meanwhile
    // is left alone.
    let updated = self
      .store
      .update_status(visit_id, TicketStatus::Waiting, TicketStatus::Skipped, now)
      .await
      .map_err(|e| {
        error!(%visit_id, error = %e, "failed to persist removal");
        Error::persistence(e)
      })?;

    state.index.remove(visit_id);
    if !updated {
      return Ok(Removal::AlreadyResolved);
    }

    info!(
      %visit_id,
      ticket = %removed.ticket_number,
      waiting = state.index.len(),
      "removed ticket from queue"
    );
    Ok(Removal::Removed(removed))
  }

  /// Move a waiting ticket to another priority class. It keeps its arrival
  /// time, so it lands behind earlier arrivals of the new class.
  pub async fn reclassify(
    &self,
    visit_id: Uuid,
    priority: PriorityClass,
  ) -> Result<Ticket> {
    let mut state = self.lock().await;

    let Some(mut ticket) = state.index.get(visit_id).cloned() else {
      return Err(Error::VisitNotFound(visit_id));
    };
    if ticket.priority == priority {
      return Ok(ticket);
    }

    match self.store.update_priority(visit_id, priority).await {
      Ok(true) => {
        let from = ticket.priority;
        ticket.priority = priority;
        state.index.insert(ticket.clone());
        info!(%visit_id, %from, to = %priority, "reclassified ticket");
        Ok(ticket)
      }
      Ok(false) => {
        state.index.remove(visit_id);
        Err(Error::VisitNotFound(visit_id))
      }
      Err(e) => Err(Error::persistence(e)),
    }
  }

  /// Rebuild memory from the store's view of the current service day.
  ///
  /// A failed load is retried once after [`QueueStore::reconnect`]. If that
  /// also fails, the existing in-memory state is kept untouched.
  pub async fn sync(&self) -> Result<SyncReport> {
    let mut state = self.lock().await;
    let window = self.service_window(Utc::now());
    debug!(day = %window.day, "syncing queue from store");

    let fresh = match self.load(window).await {
      Ok(fresh) => fresh,
      Err(first) => {
        warn!(error = %first, "sync failed, reconnecting and retrying");
        let retried = match self.store.reconnect().await {
          Ok(()) => self.load(window).await,
          Err(e) => Err(e),
        };
        match retried {
          Ok(fresh) => fresh,
          Err(e) => {
            error!(
              error = %e,
              waiting = state.index.len(),
              "sync failed after reconnect, keeping existing queue"
            );
            return Err(Error::persistence(e));
          }
        }
      }
    };

    *state = fresh;
    let report = SyncReport {
      day:     window.day,
      waiting: state.index.len(),
      serving: state.serving.len(),
    };
    info!(
      day = %report.day,
      waiting = report.waiting,
      serving = report.serving,
      "queue synced"
    );
    Ok(report)
  }

  async fn load(&self, window: ServiceWindow) -> Result<QueueState, S::Error> {
    let waiting = self.store.find_waiting_tickets(window).await?;
    let serving = self.store.find_serving(window).await?;

    let index = LiveIndex::from_tickets(waiting.into_iter().filter(|t| {
      let ok = t.status == TicketStatus::Waiting;
      if !ok {
        warn!(visit_id = %t.visit_id, status = %t.status, "skipping non-waiting ticket");
      }
      ok
    }));

    let mut pointers: HashMap<String, Ticket> = HashMap::new();
    for ticket in serving {
      let Some(server) = ticket.assigned_server_id.clone() else {
        warn!(visit_id = %ticket.visit_id, "in-service ticket has no server");
        continue;
      };
      match pointers.get(&server) {
        Some(existing) if existing.called_at >= ticket.called_at => {
          warn!(
            server = %server,
            visit_id = %ticket.visit_id,
            "server has several tickets in service"
          );
        }
        _ => {
          pointers.insert(server, ticket);
        }
      }
    }

    Ok(QueueState { index, serving: pointers })
  }

  /// Drop all in-memory state (end of day). The store is not touched.
  pub async fn reset(&self) {
    *self.lock().await = QueueState::default();
    info!("queue manager reset");
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn peek(&self) -> Option<Ticket> { self.lock().await.index.peek().cloned() }

  pub async fn len(&self) -> usize { self.lock().await.index.len() }

  pub async fn is_empty(&self) -> bool { self.lock().await.index.is_empty() }

  /// 1-based place in line, or `None` if the ticket is not waiting.
  pub async fn position(&self, visit_id: Uuid) -> Option<usize> {
    self.lock().await.index.position(visit_id)
  }

  /// `(position, len)` read under one lock, so the position never exceeds
  /// the length reported alongside it.
  pub async fn place_in_line(&self, visit_id: Uuid) -> Option<(usize, usize)> {
    let state = self.lock().await;
    let position = state.index.position(visit_id)?;
    Some((position, state.index.len()))
  }

  /// Waiting tickets in service order, at most `limit` of them.
  pub async fn waiting(&self, limit: Option<usize>) -> Vec<Ticket> {
    self.lock().await.index.snapshot(limit)
  }

  pub async fn currently_serving(&self, server_id: &str) -> Option<Ticket> {
    self.lock().await.serving.get(server_id).cloned()
  }

  /// Every server's current ticket, earliest call first.
  pub async fn serving(&self) -> Vec<Ticket> {
    let mut tickets: Vec<Ticket> =
      self.lock().await.serving.values().cloned().collect();
    tickets.sort_by(|a, b| {
      a.called_at.cmp(&b.called_at).then(a.visit_id.cmp(&b.visit_id))
    });
    tickets
  }

  /// Look a ticket up in memory first, then in the store.
  pub async fn find(&self, visit_id: Uuid) -> Result<Option<Ticket>> {
    let state = self.lock().await;
    if let Some(t) = state.index.get(visit_id) {
      return Ok(Some(t.clone()));
    }
    if let Some(t) = state.serving.values().find(|t| t.visit_id == visit_id) {
      return Ok(Some(t.clone()));
    }
    self
      .store
      .find_by_visit_id(visit_id)
      .await
      .map_err(Error::persistence)
  }
}
