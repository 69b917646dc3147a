//! SQL schema for the cameo SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS people (
    person_id     TEXT PRIMARY KEY,
    display_name  TEXT NOT NULL
);

-- One row per (document, page, person); re-ingesting keeps the higher
-- confidence.
CREATE TABLE IF NOT EXISTS appearances (
    document_id  TEXT    NOT NULL,
    page         INTEGER NOT NULL CHECK (page >= 1),
    person_id    TEXT    NOT NULL,
    confidence   REAL,             -- NULL reads back as 0
    ingested_at  TEXT    NOT NULL, -- RFC 3339 UTC
    PRIMARY KEY (document_id, page, person_id)
);

CREATE INDEX IF NOT EXISTS appearances_person_idx   ON appearances(person_id);
CREATE INDEX IF NOT EXISTS appearances_document_idx ON appearances(document_id);

PRAGMA user_version = 1;
";
