//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with nanosecond precision
//! and a `Z` suffix. Every value has the same width, so string comparison in
//! SQL orders them chronologically. UUIDs are stored as hyphenated lowercase
//! strings; enums as their snake_case names.

use chrono::{DateTime, SecondsFormat, Utc};
use triage_core::{PriorityClass, Ticket, TicketStatus};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_priority(p: PriorityClass) -> &'static str {
  match p {
    PriorityClass::Emergency => "emergency",
    PriorityClass::SeniorCitizen => "senior_citizen",
    PriorityClass::Regular => "regular",
  }
}

pub fn encode_status(s: TicketStatus) -> &'static str {
  match s {
    TicketStatus::Waiting => "waiting",
    TicketStatus::Called => "called",
    TicketStatus::InService => "in_service",
    TicketStatus::Completed => "completed",
    TicketStatus::Skipped => "skipped",
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that builds a [`RawTicket`].
pub const TICKET_COLUMNS: &str = "visit_id, ticket_number, priority, status, \
   created_at, called_at, completed_at, assigned_server_id, subject_ref";

/// Raw strings read directly from a `tickets` row.
pub struct RawTicket {
  pub visit_id:           String,
  pub ticket_number:      String,
  pub priority:           String,
  pub status:             String,
  pub created_at:         String,
  pub called_at:          Option<String>,
  pub completed_at:       Option<String>,
  pub assigned_server_id: Option<String>,
  pub subject_ref:        String,
}

impl RawTicket {
  /// Map a row selected with [`TICKET_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visit_id:           row.get(0)?,
      ticket_number:      row.get(1)?,
      priority:           row.get(2)?,
      status:             row.get(3)?,
      created_at:         row.get(4)?,
      called_at:          row.get(5)?,
      completed_at:       row.get(6)?,
      assigned_server_id: row.get(7)?,
      subject_ref:        row.get(8)?,
    })
  }

  pub fn into_ticket(self) -> Result<Ticket> {
    Ok(Ticket {
      visit_id:           decode_uuid(&self.visit_id)?,
      ticket_number:      self.ticket_number.parse()?,
      priority:           PriorityClass::parse(&self.priority)?,
      status:             TicketStatus::parse(&self.status)?,
      created_at:         decode_dt(&self.created_at)?,
      called_at:          self.called_at.as_deref().map(decode_dt).transpose()?,
      completed_at:       self.completed_at.as_deref().map(decode_dt).transpose()?,
      assigned_server_id: self.assigned_server_id,
      subject_ref:        self.subject_ref,
    })
  }
}
