//! Ticket types: the unit of work flowing through the queue.
//!
//! A ticket is created `Waiting`, taken by a server (`InService`), and ends in
//! one of two terminal states. Statuses only ever move forward.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, ticket_number::TicketNumber};

// ─── Priority class ──────────────────────────────────────────────────────────

/// Urgency tier. Lower [`rank`](PriorityClass::rank) is served first.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PriorityClass {
  Emergency,
  SeniorCitizen,
  Regular,
}

impl PriorityClass {
  pub fn rank(self) -> u8 {
    match self {
      Self::Emergency => 0,
      Self::SeniorCitizen => 1,
      Self::Regular => 2,
    }
  }

  /// Parse the stored discriminant, e.g. `"senior_citizen"`.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownPriority(s.to_owned()))
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TicketStatus {
  /// Sitting in the waiting room.
  Waiting,
  /// Announced but not yet with a server.
  Called,
  InService,
  Completed,
  /// Did not show up, or removed from the queue by an operator.
  Skipped,
}

impl TicketStatus {
  /// Position in the one-directional lifecycle. Both terminal states share
  /// the highest rank, so neither can follow the other.
  pub fn rank(self) -> u8 {
    match self {
      Self::Waiting => 0,
      Self::Called => 1,
      Self::InService => 2,
      Self::Completed | Self::Skipped => 3,
    }
  }

  pub fn is_terminal(self) -> bool { self.rank() == 3 }

  pub fn can_transition_to(self, next: TicketStatus) -> bool {
    !self.is_terminal() && next.rank() > self.rank()
  }

  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }
}

// ─── Service day ─────────────────────────────────────────────────────────────

/// One service day expressed as a half-open UTC interval `[start, end)`.
///
/// Ticket numbers restart in each window, and every store query that
/// rebuilds queue state is scoped to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceWindow {
  pub day:   NaiveDate,
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl ServiceWindow {
  /// The calendar day in `offset` that contains `at`.
  pub fn containing(at: DateTime<Utc>, offset: FixedOffset) -> Self {
    Self::for_day(at.with_timezone(&offset).date_naive(), offset)
  }

  pub fn for_day(day: NaiveDate, offset: FixedOffset) -> Self {
    let local_midnight = day.and_time(NaiveTime::MIN);
    let utc_midnight =
      local_midnight - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    let start = utc_midnight.and_utc();
    Self { day, start, end: start + TimeDelta::days(1) }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at < self.end
  }
}

// ─── Ticket ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
  pub visit_id:           Uuid,
  pub ticket_number:      TicketNumber,
  pub priority:           PriorityClass,
  pub status:             TicketStatus,
  /// Arrival time; the FIFO key within a priority class. Never changes.
  pub created_at:         DateTime<Utc>,
  pub called_at:          Option<DateTime<Utc>>,
  pub completed_at:       Option<DateTime<Utc>>,
  pub assigned_server_id: Option<String>,
  /// Opaque reference to the person being served. Resolved elsewhere.
  pub subject_ref:        String,
}

impl Ticket {
  /// A fresh `Waiting` ticket with a random visit id.
  pub fn new(
    ticket_number: TicketNumber,
    priority: PriorityClass,
    subject_ref: impl Into<String>,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      visit_id: Uuid::new_v4(),
      ticket_number,
      priority,
      status: TicketStatus::Waiting,
      created_at,
      called_at: None,
      completed_at: None,
      assigned_server_id: None,
      subject_ref: subject_ref.into(),
    }
  }

  /// Move to `next`, stamping `called_at` or `completed_at` as appropriate.
  pub fn advance(&mut self, next: TicketStatus, at: DateTime<Utc>) -> Result<()> {
    if !self.status.can_transition_to(next) {
      return Err(Error::InvalidTransition { from: self.status, to: next });
    }
    match next {
      TicketStatus::Called | TicketStatus::InService => {
        self.called_at.get_or_insert(at);
      }
      TicketStatus::Completed | TicketStatus::Skipped => {
        self.completed_at = Some(at);
      }
      TicketStatus::Waiting => {}
    }
    self.status = next;
    Ok(())
  }

  /// Hand the ticket to `server_id`.
  pub fn assign(&mut self, server_id: &str, at: DateTime<Utc>) -> Result<()> {
    self.advance(TicketStatus::InService, at)?;
    self.assigned_server_id = Some(server_id.to_owned());
    Ok(())
  }
}

// ─── NewTicket ───────────────────────────────────────────────────────────────

/// Input to [`crate::QueueManager::issue`]. The visit id, ticket number and
/// arrival time are assigned by the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
  pub priority:    PriorityClass,
  pub subject_ref: String,
}

impl NewTicket {
  pub fn new(priority: PriorityClass, subject_ref: impl Into<String>) -> Self {
    Self { priority, subject_ref: subject_ref.into() }
  }
}
