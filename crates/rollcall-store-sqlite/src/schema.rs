//! SQL schema for the rollcall SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS groups (
    group_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    department  TEXT NOT NULL,
    class_name  TEXT NOT NULL,
    section     TEXT NOT NULL,
    created_at  TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- Bearer tokens scoping registration/attendance flows to one group.
-- Status is mutated only by administrative action, never by the pipeline.
CREATE TABLE IF NOT EXISTS links (
    link_id    TEXT PRIMARY KEY,
    group_id   TEXT NOT NULL REFERENCES groups(group_id),
    token      TEXT NOT NULL UNIQUE,
    kind       TEXT NOT NULL,   -- 'registration' | 'attendance'
    status     TEXT NOT NULL,   -- 'active' | 'expired' | 'revoked'
    expires_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id   TEXT PRIMARY KEY,
    group_id     TEXT NOT NULL REFERENCES groups(group_id),
    display_name TEXT NOT NULL,
    email        TEXT NOT NULL,
    external_id  TEXT NOT NULL,  -- institution-issued id
    department   TEXT NOT NULL,
    phone        TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE (group_id, external_id)
);

-- Enrolled face feature vectors; one or more per student. Written only
-- inside the enrollment transaction, so a roster snapshot never observes a
-- partially-enrolled student.
CREATE TABLE IF NOT EXISTS embeddings (
    embedding_id TEXT PRIMARY KEY,
    student_id   TEXT NOT NULL REFERENCES students(student_id),
    vector_json  TEXT NOT NULL,  -- JSON array of f32
    enrolled_at  TEXT NOT NULL
);

-- The attendance ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table. The uniqueness
-- key is the sole point of truth for attendance deduplication.
CREATE TABLE IF NOT EXISTS attendance (
    record_id   TEXT PRIMARY KEY,
    student_id  TEXT NOT NULL REFERENCES students(student_id),
    link_id     TEXT NOT NULL REFERENCES links(link_id),
    att_window  TEXT NOT NULL,  -- time bucket, e.g. '2026-08-30' or 'link'
    recorded_at TEXT NOT NULL,
    UNIQUE (student_id, link_id, att_window)
);

CREATE INDEX IF NOT EXISTS students_group_idx     ON students(group_id);
CREATE INDEX IF NOT EXISTS embeddings_student_idx ON embeddings(student_id);
CREATE INDEX IF NOT EXISTS attendance_window_idx  ON attendance(att_window);

PRAGMA user_version = 1;
";
