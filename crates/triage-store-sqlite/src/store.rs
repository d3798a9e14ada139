//! [`SqliteStore`], the SQLite implementation of [`QueueStore`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tokio::sync::RwLock;
use uuid::Uuid;

use triage_core::{
  store::QueueStore,
  ticket::{PriorityClass, ServiceWindow, Ticket, TicketStatus},
};

use crate::{
  encode::{encode_dt, encode_priority, encode_status, encode_uuid, RawTicket, TICKET_COLUMNS},
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Triage ticket store backed by a single SQLite file.
///
/// Cloning is cheap; clones share one connection, and a reconnect through
/// any clone is seen by all of them.
#[derive(Clone)]
pub struct SqliteStore {
  conn: Arc<RwLock<tokio_rusqlite::Connection>>,
  path: Option<Arc<PathBuf>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = connect(Some(path.as_path())).await?;
    Ok(Self {
      conn: Arc::new(RwLock::new(conn)),
      path: Some(Arc::new(path)),
    })
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = connect(None).await?;
    Ok(Self { conn: Arc::new(RwLock::new(conn)), path: None })
  }

  async fn conn(&self) -> tokio_rusqlite::Connection {
    self.conn.read().await.clone()
  }

  /// Run a `SELECT {TICKET_COLUMNS} ...` query and decode every row.
  async fn query_tickets(
    &self,
    sql: String,
    params: Vec<String>,
  ) -> Result<Vec<Ticket>> {
    let raws: Vec<RawTicket> = self
      .conn()
      .await
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawTicket::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTicket::into_ticket).collect()
  }
}

async fn connect(path: Option<&Path>) -> Result<tokio_rusqlite::Connection> {
  let conn = match path {
    Some(path) => tokio_rusqlite::Connection::open(path).await?,
    None => tokio_rusqlite::Connection::open_in_memory().await?,
  };
  conn
    .call(|conn| {
      conn.execute_batch(SCHEMA)?;
      Ok(())
    })
    .await?;
  Ok(conn)
}

fn window_params(window: ServiceWindow) -> Vec<String> {
  vec![encode_dt(window.start), encode_dt(window.end)]
}

// ─── QueueStore impl ─────────────────────────────────────────────────────────

impl QueueStore for SqliteStore {
  type Error = crate::Error;

  async fn create_ticket(&self, ticket: Ticket) -> Result<()> {
    let visit_id     = encode_uuid(ticket.visit_id);
    let number       = ticket.ticket_number.to_string();
    let priority     = encode_priority(ticket.priority);
    let status       = encode_status(ticket.status);
    let created_at   = encode_dt(ticket.created_at);
    let called_at    = ticket.called_at.map(encode_dt);
    let completed_at = ticket.completed_at.map(encode_dt);
    let server_id    = ticket.assigned_server_id;
    let subject_ref  = ticket.subject_ref;

    self
      .conn()
      .await
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tickets
             (visit_id, ticket_number, priority, status, created_at,
              called_at, completed_at, assigned_server_id, subject_ref)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            visit_id,
            number,
            priority,
            status,
            created_at,
            called_at,
            completed_at,
            server_id,
            subject_ref,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_status(
    &self,
    visit_id: Uuid,
    from: TicketStatus,
    to: TicketStatus,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    if !from.can_transition_to(to) {
      return Ok(false);
    }
    let stamp = if to.is_terminal() {
      "completed_at = ?3"
    } else {
      "called_at = COALESCE(called_at, ?3)"
    };
    let sql = format!(
      "UPDATE tickets SET status = ?2, {stamp}
        WHERE visit_id = ?1 AND status = ?4"
    );
    let id_str = encode_uuid(visit_id);
    let to     = encode_status(to);
    let from   = encode_status(from);
    let at_str = encode_dt(at);

    let changed = self
      .conn()
      .await
      .call(move |conn| {
        Ok(conn.execute(&sql, rusqlite::params![id_str, to, at_str, from])?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn assign_server(
    &self,
    visit_id: Uuid,
    server_id: &str,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str    = encode_uuid(visit_id);
    let server_id = server_id.to_owned();
    let at_str    = encode_dt(at);

    let changed = self
      .conn()
      .await
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE tickets
              SET status = 'in_service', assigned_server_id = ?2, called_at = ?3
            WHERE visit_id = ?1 AND status = 'waiting'",
          rusqlite::params![id_str, server_id, at_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn update_priority(
    &self,
    visit_id: Uuid,
    priority: PriorityClass,
  ) -> Result<bool> {
    let id_str   = encode_uuid(visit_id);
    let priority = encode_priority(priority);

    let changed = self
      .conn()
      .await
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE tickets SET priority = ?2 WHERE visit_id = ?1",
          rusqlite::params![id_str, priority],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn find_waiting_tickets(&self, window: ServiceWindow) -> Result<Vec<Ticket>> {
    let sql = format!(
      "SELECT {TICKET_COLUMNS} FROM tickets
        WHERE status = 'waiting' AND created_at >= ?1 AND created_at < ?2
        ORDER BY created_at"
    );
    self.query_tickets(sql, window_params(window)).await
  }

  async fn find_currently_serving(&self, server_id: &str) -> Result<Option<Ticket>> {
    let sql = format!(
      "SELECT {TICKET_COLUMNS} FROM tickets
        WHERE status = 'in_service' AND assigned_server_id = ?1
        ORDER BY called_at DESC
        LIMIT 1"
    );
    let found = self.query_tickets(sql, vec![server_id.to_owned()]).await?;
    Ok(found.into_iter().next())
  }

  async fn find_serving(&self, window: ServiceWindow) -> Result<Vec<Ticket>> {
    let sql = format!(
      "SELECT {TICKET_COLUMNS} FROM tickets
        WHERE status = 'in_service' AND created_at >= ?1 AND created_at < ?2
        ORDER BY called_at"
    );
    self.query_tickets(sql, window_params(window)).await
  }

  async fn find_by_visit_id(&self, visit_id: Uuid) -> Result<Option<Ticket>> {
    let id_str = encode_uuid(visit_id);
    let raw: Option<RawTicket> = self
      .conn()
      .await
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE visit_id = ?1"),
              rusqlite::params![id_str],
              RawTicket::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTicket::into_ticket).transpose()
  }

  async fn ticket_numbers(&self, window: ServiceWindow) -> Result<Vec<String>> {
    let [start, end] = [encode_dt(window.start), encode_dt(window.end)];
    let numbers = self
      .conn()
      .await
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT ticket_number FROM tickets
            WHERE created_at >= ?1 AND created_at < ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![start, end], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(numbers)
  }

  async fn reconnect(&self) -> Result<()> {
    let Some(path) = self.path.as_deref() else {
      // An in-memory database cannot be reopened without losing it.
      tracing::debug!("reconnect requested for in-memory store; keeping connection");
      return Ok(());
    };

    let fresh = connect(Some(path.as_path())).await?;
    let mut conn = self.conn.write().await;
    *conn = fresh;
    tracing::info!(path = %path.display(), "reopened sqlite store");
    Ok(())
  }
}
