//! SQL schemas for the two stores.
//!
//! Each is executed once when its connection opens. Both are idempotent
//! thanks to `CREATE TABLE IF NOT EXISTS`.

/// The document store: one JSON body per achievement. The scalar columns
/// mirror body fields that queries filter or sort on.
pub const DOCUMENT_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS documents (
    id               TEXT PRIMARY KEY,   -- 24 hex chars
    student_id       TEXT NOT NULL,
    achievement_type TEXT NOT NULL DEFAULT '',
    body             TEXT NOT NULL,      -- full achievement as JSON
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    deleted_at       TEXT                -- soft delete marker
);

CREATE INDEX IF NOT EXISTS documents_student_idx ON documents(student_id);

PRAGMA user_version = 1;
";

/// The relational store: workflow references, the student directory, and
/// role-based access control.
pub const REFERENCE_SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS roles (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS permissions (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,   -- 'resource:action'
    resource    TEXT NOT NULL,
    action      TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS role_permissions (
    role_id       TEXT NOT NULL REFERENCES roles(id),
    permission_id TEXT NOT NULL REFERENCES permissions(id),
    PRIMARY KEY (role_id, permission_id)
);

CREATE TABLE IF NOT EXISTS lecturers (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL UNIQUE,
    advisor_id  TEXT REFERENCES lecturers(id),
    created_at  TEXT NOT NULL
);

-- Exactly one row per document. Rows are never physically removed by the
-- student flow; deletion moves status to 'deleted'.
CREATE TABLE IF NOT EXISTS achievement_references (
    id             TEXT PRIMARY KEY,
    student_id     TEXT NOT NULL REFERENCES students(id),
    document_id    TEXT NOT NULL UNIQUE,
    status         TEXT NOT NULL DEFAULT 'draft'
                   CHECK (status IN ('draft', 'submitted', 'verified', 'rejected', 'deleted')),
    submitted_at   TEXT,
    verified_at    TEXT,
    verified_by    TEXT,
    rejection_note TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS references_student_idx ON achievement_references(student_id);
CREATE INDEX IF NOT EXISTS references_status_idx  ON achievement_references(status);
CREATE INDEX IF NOT EXISTS students_advisor_idx   ON students(advisor_id);

PRAGMA user_version = 1;
";
