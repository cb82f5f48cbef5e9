//! Database schema migrations for the memory store.

/// Migration definitions, applied in order against `schema_version`.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: sessions, messages, memory records, project knowledge",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Code index: repositories and code chunks",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "Code index: track async def chunks",
        up: MIGRATION_V3_UP,
    },
];

/// A single schema migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    project_tag TEXT NOT NULL,
    indexed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project_tag);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    meta TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at);

CREATE TABLE IF NOT EXISTS project_knowledge (
    project_tag TEXT PRIMARY KEY,
    overview TEXT NOT NULL,
    rules TEXT NOT NULL,
    summary_list TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL
);

-- Primary key is session_id itself: exactly one memory record per
-- session, matching the 1:1 invariant.
CREATE TABLE IF NOT EXISTS memory_records (
    session_id TEXT PRIMARY KEY REFERENCES sessions(id) ON DELETE CASCADE,
    project_tag TEXT NOT NULL,
    title TEXT NOT NULL,
    summary_short TEXT NOT NULL,
    summary_detailed TEXT NOT NULL,
    memory_snippet TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    key_topics TEXT NOT NULL DEFAULT '[]',
    key_entities TEXT NOT NULL DEFAULT '{}',
    indexer_model TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memory_records_project ON memory_records(project_tag, indexed_at);

CREATE TABLE IF NOT EXISTS memory_embeddings (
    session_id TEXT PRIMARY KEY REFERENCES memory_records(session_id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);
"#;

const MIGRATION_V2_UP: &str = r#"
UPDATE schema_version SET version = 2, applied_at = datetime('now');

CREATE TABLE IF NOT EXISTS repository_metadata (
    repository_id TEXT PRIMARY KEY,
    root_path TEXT NOT NULL,
    last_indexed_commit TEXT,
    last_indexed_at TEXT,
    production_targets TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS code_chunks (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repository_metadata(repository_id) ON DELETE CASCADE,
    file_path TEXT NOT NULL,
    language TEXT NOT NULL,
    function_name TEXT,
    class_name TEXT,
    docstring TEXT,
    code TEXT NOT NULL,
    embedding_text TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    production_targets TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_code_chunks_repo_file ON code_chunks(repository_id, file_path);

CREATE TABLE IF NOT EXISTS code_chunk_embeddings (
    chunk_id TEXT PRIMARY KEY REFERENCES code_chunks(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);
"#;

const MIGRATION_V3_UP: &str = r#"
UPDATE schema_version SET version = 3, applied_at = datetime('now');

ALTER TABLE code_chunks ADD COLUMN is_async INTEGER NOT NULL DEFAULT 0;
"#;

pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply every migration newer than the schema's current version.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "applying migration v{}: {}",
                migration.version,
                migration.description
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
