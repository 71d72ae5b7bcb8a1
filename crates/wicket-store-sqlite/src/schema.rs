//! SQL schema for the wicket SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL    -- ISO 8601 UTC; store-assigned
);

-- Created together with its subject; never deleted by this core.
CREATE TABLE IF NOT EXISTS profiles (
    subject_id  TEXT PRIMARY KEY REFERENCES subjects(subject_id),
    first_name  TEXT NOT NULL
);

-- The PRIMARY KEY on name is the atomic check-and-insert required for
-- registration: under concurrent creation of one name, exactly one
-- insert succeeds.
CREATE TABLE IF NOT EXISTS identifiers (
    name        TEXT PRIMARY KEY,
    hash        TEXT NOT NULL,   -- derived verification hash, never plaintext
    user_id     TEXT NOT NULL REFERENCES subjects(subject_id),
    UNIQUE (user_id)             -- one password credential per subject
);

PRAGMA user_version = 1;
";
