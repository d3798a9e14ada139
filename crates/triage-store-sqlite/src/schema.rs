//! SQL schema for the Triage SQLite store.
//!
//! Executed on every connection open. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per visit. Rows are never deleted by the queue itself.
-- Ticket numbers repeat after Z10 within a day, so they are not UNIQUE.
CREATE TABLE IF NOT EXISTS tickets (
    visit_id           TEXT PRIMARY KEY,
    ticket_number      TEXT NOT NULL,
    priority           TEXT NOT NULL
        CHECK (priority IN ('emergency', 'senior_citizen', 'regular')),
    status             TEXT NOT NULL
        CHECK (status IN ('waiting', 'called', 'in_service', 'completed', 'skipped')),
    created_at         TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    called_at          TEXT,
    completed_at       TEXT,
    assigned_server_id TEXT,
    subject_ref        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS tickets_status_created_idx ON tickets(status, created_at);
CREATE INDEX IF NOT EXISTS tickets_created_idx        ON tickets(created_at);
CREATE INDEX IF NOT EXISTS tickets_server_idx         ON tickets(assigned_server_id, status);

PRAGMA user_version = 1;
";
