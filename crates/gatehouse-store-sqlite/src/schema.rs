//! SQL schema for the Gatehouse SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    credential  TEXT NOT NULL UNIQUE
);

-- Occupancy columns are the only ones the engine writes.
CREATE TABLE IF NOT EXISTS areas (
    area_id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL UNIQUE,
    active              INTEGER NOT NULL DEFAULT 1,
    occupied            INTEGER NOT NULL DEFAULT 0,
    occupant_name       TEXT,
    occupant_credential TEXT,
    occupant_user_id    INTEGER REFERENCES users(user_id),
    last_movement_at    TEXT,            -- RFC 3339 UTC or NULL
    CHECK (occupied = (occupant_credential IS NOT NULL))
);

CREATE TABLE IF NOT EXISTS permissions (
    permission_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id       INTEGER NOT NULL REFERENCES users(user_id),
    area_id       INTEGER NOT NULL REFERENCES areas(area_id),
    access_level  TEXT NOT NULL,
    valid_from    TEXT NOT NULL,         -- YYYY-MM-DD, inclusive
    valid_until   TEXT NOT NULL,         -- YYYY-MM-DD, inclusive
    status        TEXT NOT NULL,
    CHECK (valid_from <= valid_until)
);

-- Audit records are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_records (
    record_id   TEXT PRIMARY KEY,
    user_id     INTEGER REFERENCES users(user_id),
    area_id     INTEGER NOT NULL REFERENCES areas(area_id),
    area_name   TEXT NOT NULL,
    event_kind  TEXT NOT NULL,           -- 'entry' | 'exit' | 'probe'
    result      TEXT NOT NULL,           -- 'AUTHORIZED' | 'DENIED'
    credential  TEXT NOT NULL,
    note        TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS permissions_pair_idx ON permissions(user_id, area_id);
CREATE INDEX IF NOT EXISTS audit_user_idx       ON audit_records(user_id);
CREATE INDEX IF NOT EXISTS audit_recorded_idx   ON audit_records(recorded_at);

PRAGMA user_version = 1;
";
