//! SQLite-backed memory store (C2).
//!
//! Two connections to the same database file: a writer guarded by its own
//! mutex and a reader guarded by a separate one, so a long-running read
//! doesn't block a concurrent write. Every public method takes `&self` —
//! `Storage` is `Send + Sync` and callers share it via `Arc<Storage>`
//! rather than `Arc<Mutex<Storage>>`.
//!
//! Vectors live in two places: the raw bytes in a `*_embeddings` table (the
//! durable source of truth) and, when the `vector-search` feature is on, an
//! in-memory HNSW index rebuilt from that table at startup.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::Config;
use crate::error::StorageError;
use crate::memory::{
    CodeChunk, KeyEntities, Message, MessageMeta, MemoryRecord, ProjectKnowledge,
    RepositoryMetadata, Role, Session,
};
use crate::project::ProjectTag;

#[cfg(feature = "vector-search")]
use crate::embeddings::{vector_from_bytes, vector_to_bytes};
#[cfg(feature = "vector-search")]
use crate::search::VectorIndex;

pub type Result<T> = std::result::Result<T, StorageError>;

/// The memory store. One instance per project database file.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    #[cfg(feature = "vector-search")]
    memory_vectors: Mutex<VectorIndex>,
    #[cfg(feature = "vector-search")]
    code_vectors: Mutex<VectorIndex>,
}

impl Storage {
    fn configure_connection(conn: &Connection) -> Result<()> {
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("RECALL_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Open (creating if needed) the store at `config.db_path`.
    pub fn new(config: &Config) -> Result<Self> {
        Self::open(&config.db_path)
    }

    fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o700);
                let _ = std::fs::set_permissions(parent, perms);
            }
        }

        let writer_conn = Connection::open(path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        super::migrations::apply_migrations(&writer_conn)
            .map_err(|e| StorageError::Migration { version: 0, source: e })?;

        let reader_conn = Connection::open(path)?;
        Self::configure_connection(&reader_conn)?;

        let storage = Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            #[cfg(feature = "vector-search")]
            memory_vectors: Mutex::new(VectorIndex::new().map_err(StorageError::VectorSearch)?),
            #[cfg(feature = "vector-search")]
            code_vectors: Mutex::new(VectorIndex::new().map_err(StorageError::VectorSearch)?),
        };

        #[cfg(feature = "vector-search")]
        storage.load_vectors_into_indices()?;

        Ok(storage)
    }

    /// Open an in-memory store, used by tests.
    ///
    /// A bare `Connection::open_in_memory()` per connection would give the
    /// writer and the reader two independent, unrelated private databases —
    /// nothing written through one is ever visible to the other. Instead
    /// both connections open the same *named* in-memory database under
    /// SQLite's shared-cache mode (`cache=shared`), which keeps them talking
    /// to the same backing store for as long as at least one connection to
    /// it stays open — which `Storage` guarantees, since it holds both for
    /// its entire lifetime. The name is process-unique so concurrent tests
    /// opening their own in-memory stores never share state.
    pub fn open_in_memory() -> Result<Self> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:recall-mem-{id}?mode=memory&cache=shared");

        let writer_conn = Connection::open(&uri)?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)
            .map_err(|e| StorageError::Migration { version: 0, source: e })?;

        let reader_conn = Connection::open(&uri)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            #[cfg(feature = "vector-search")]
            memory_vectors: Mutex::new(VectorIndex::new().map_err(StorageError::VectorSearch)?),
            #[cfg(feature = "vector-search")]
            code_vectors: Mutex::new(VectorIndex::new().map_err(StorageError::VectorSearch)?),
        })
    }

    #[cfg(feature = "vector-search")]
    fn load_vectors_into_indices(&self) -> Result<()> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::NotFound("reader lock poisoned".into()))?;

        {
            let mut stmt = reader.prepare("SELECT memory_id, embedding FROM memory_embeddings")?;
            let rows: Vec<(String, Vec<u8>)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .filter_map(|r| r.ok())
                .collect();
            drop(stmt);

            let mut index = self
                .memory_vectors
                .lock()
                .map_err(|_| StorageError::NotFound("memory vector index lock poisoned".into()))?;
            for (id, bytes) in rows {
                if let Some(vector) = vector_from_bytes(&bytes) {
                    let _ = index.add(&id, &vector);
                }
            }
        }

        {
            let mut stmt =
                reader.prepare("SELECT chunk_id, embedding FROM code_chunk_embeddings")?;
            let rows: Vec<(String, Vec<u8>)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .filter_map(|r| r.ok())
                .collect();
            drop(stmt);

            let mut index = self
                .code_vectors
                .lock()
                .map_err(|_| StorageError::NotFound("code vector index lock poisoned".into()))?;
            for (id, bytes) in rows {
                if let Some(vector) = vector_from_bytes(&bytes) {
                    let _ = index.add(&id, &vector);
                }
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn upsert_session(&self, session: &Session) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.execute(
            "INSERT INTO sessions (id, title, project_tag, indexed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                project_tag = excluded.project_tag,
                indexed = excluded.indexed,
                updated_at = excluded.updated_at",
            params![
                session.id,
                session.title,
                session.project_tag.as_str(),
                session.indexed,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Update only a session's project tag, used by the indexer's
    /// tag-promotion-from-`general` reconciliation branch.
    pub fn update_session_project_tag(&self, session_id: &str, project_tag: ProjectTag) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.execute(
            "UPDATE sessions SET project_tag = ?2, updated_at = ?3 WHERE id = ?1",
            params![session_id, project_tag.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Mark a session as indexed (or not), used after a successful /
    /// failed indexing attempt.
    pub fn set_session_indexed(&self, session_id: &str, indexed: bool) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.execute(
            "UPDATE sessions SET indexed = ?2, updated_at = ?3 WHERE id = ?1",
            params![session_id, indexed, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let reader = self.reader.lock().unwrap();
        reader
            .query_row(
                "SELECT id, title, project_tag, indexed, created_at, updated_at
                 FROM sessions WHERE id = ?1",
                params![session_id],
                row_to_session,
            )
            .optional()
            .map_err(StorageError::from)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub fn append_message(&self, message: &Message) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        let meta_json = serde_json::to_string(&message.meta)?;
        writer.execute(
            "INSERT INTO messages (id, session_id, role, content, meta, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.session_id,
                role_to_str(message.role),
                message.content,
                meta_json,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn load_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let reader = self.reader.lock().unwrap();
        let mut stmt = reader.prepare(
            "SELECT id, session_id, role, content, meta, created_at
             FROM messages WHERE session_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Project knowledge
    // ------------------------------------------------------------------

    pub fn get_project_knowledge(&self, project_tag: ProjectTag) -> Result<Option<ProjectKnowledge>> {
        let reader = self.reader.lock().unwrap();
        reader
            .query_row(
                "SELECT project_tag, overview, rules, summary_list, updated_at
                 FROM project_knowledge WHERE project_tag = ?1",
                params![project_tag.as_str()],
                |row| {
                    let tag: String = row.get(0)?;
                    let overview: String = row.get(1)?;
                    let rules: String = row.get(2)?;
                    let summary_list: String = row.get(3)?;
                    let updated_at: String = row.get(4)?;
                    Ok(ProjectKnowledge {
                        project_tag: crate::project::normalize_project_tag(&tag),
                        overview,
                        rules,
                        summary_list: serde_json::from_str(&summary_list).unwrap_or_default(),
                        updated_at: parse_rfc3339(&updated_at),
                    })
                },
            )
            .optional()
            .map_err(StorageError::from)
    }

    pub fn upsert_project_knowledge(&self, knowledge: &ProjectKnowledge) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.execute(
            "INSERT INTO project_knowledge (project_tag, overview, rules, summary_list, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(project_tag) DO UPDATE SET
                overview = excluded.overview,
                rules = excluded.rules,
                summary_list = excluded.summary_list,
                updated_at = excluded.updated_at",
            params![
                knowledge.project_tag.as_str(),
                knowledge.overview,
                knowledge.rules,
                serde_json::to_string(&knowledge.summary_list)?,
                knowledge.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Memory records
    // ------------------------------------------------------------------

    pub fn upsert_memory_record(&self, record: &MemoryRecord) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.execute(
            "INSERT INTO memory_records
                (session_id, project_tag, title, summary_short, summary_detailed, memory_snippet,
                 tags, key_topics, key_entities, indexer_model, version, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(session_id) DO UPDATE SET
                project_tag = excluded.project_tag,
                title = excluded.title,
                summary_short = excluded.summary_short,
                summary_detailed = excluded.summary_detailed,
                memory_snippet = excluded.memory_snippet,
                tags = excluded.tags,
                key_topics = excluded.key_topics,
                key_entities = excluded.key_entities,
                indexer_model = excluded.indexer_model,
                version = excluded.version,
                indexed_at = excluded.indexed_at",
            params![
                record.session_id,
                record.project_tag.as_str(),
                record.title,
                record.summary_short,
                record.summary_detailed,
                record.memory_snippet,
                serde_json::to_string(&record.tags)?,
                serde_json::to_string(&record.key_topics)?,
                serde_json::to_string(&record.key_entities)?,
                record.indexer_model,
                record.version,
                record.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[cfg(feature = "vector-search")]
    pub fn set_memory_embedding(&self, session_id: &str, embedding: &[f32]) -> Result<()> {
        let bytes = vector_to_bytes(embedding);
        {
            let writer = self.writer.lock().unwrap();
            writer.execute(
                "INSERT INTO memory_embeddings (session_id, embedding, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(session_id) DO UPDATE SET embedding = excluded.embedding",
                params![session_id, bytes, Utc::now().to_rfc3339()],
            )?;
        }

        let mut index = self
            .memory_vectors
            .lock()
            .map_err(|_| StorageError::NotFound("memory vector index lock poisoned".into()))?;
        let _ = index.remove(session_id);
        index
            .add(session_id, embedding)
            .map_err(StorageError::VectorSearch)?;
        Ok(())
    }

    pub fn get_memory_record(&self, session_id: &str) -> Result<Option<MemoryRecord>> {
        let reader = self.reader.lock().unwrap();
        reader
            .query_row(
                "SELECT session_id, project_tag, title, summary_short, summary_detailed, memory_snippet,
                        tags, key_topics, key_entities, indexer_model, version, indexed_at
                 FROM memory_records WHERE session_id = ?1",
                params![session_id],
                row_to_memory_record,
            )
            .optional()
            .map_err(StorageError::from)
    }

    pub fn delete_memory_record(&self, session_id: &str) -> Result<bool> {
        let deleted = {
            let writer = self.writer.lock().unwrap();
            writer.execute(
                "DELETE FROM memory_records WHERE session_id = ?1",
                params![session_id],
            )?
        };
        #[cfg(feature = "vector-search")]
        {
            let mut index = self
                .memory_vectors
                .lock()
                .map_err(|_| StorageError::NotFound("memory vector index lock poisoned".into()))?;
            let _ = index.remove(session_id);
        }
        Ok(deleted > 0)
    }

    /// List memory records for `project_tag`, most recently indexed
    /// first, capped at `limit`. `project_tag = None` lists across all
    /// projects.
    pub fn list_memory_records(
        &self,
        project_tag: Option<ProjectTag>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let reader = self.reader.lock().unwrap();
        let base = "SELECT session_id, project_tag, title, summary_short, summary_detailed, memory_snippet,
                    tags, key_topics, key_entities, indexer_model, version, indexed_at
             FROM memory_records";
        let rows = match project_tag {
            Some(tag) => {
                let mut stmt = reader.prepare(&format!(
                    "{base} WHERE project_tag = ?1 ORDER BY indexed_at DESC LIMIT ?2"
                ))?;
                stmt.query_map(params![tag.as_str(), limit as i64], row_to_memory_record)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    reader.prepare(&format!("{base} ORDER BY indexed_at DESC LIMIT ?1"))?;
                stmt.query_map(params![limit as i64], row_to_memory_record)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    /// Most recent `limit` records for `project_tag`, used by the
    /// generic keyword strategy and `list-recent` style callers.
    pub fn list_recent_memories(&self, project_tag: ProjectTag, limit: usize) -> Result<Vec<MemoryRecord>> {
        self.list_memory_records(Some(project_tag), limit)
    }

    /// Substring match over `title`, most recent first — backs DAAS's
    /// single-dream quoted-title lookup. `limit` caps how many
    /// candidates are returned; the caller picks the most recent.
    pub fn search_memory_title(
        &self,
        project_tag: ProjectTag,
        title_pattern: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let reader = self.reader.lock().unwrap();
        let pattern = format!("%{}%", title_pattern.to_lowercase());
        let mut stmt = reader.prepare(
            "SELECT session_id, project_tag, title, summary_short, summary_detailed, memory_snippet,
                    tags, key_topics, key_entities, indexer_model, version, indexed_at
             FROM memory_records
             WHERE project_tag = ?1 AND lower(title) LIKE ?2
             ORDER BY indexed_at DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![project_tag.as_str(), pattern, limit as i64], row_to_memory_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Records for `project_tag` whose embedding is still null, used by
    /// the `backfill-embeddings` CLI command.
    pub fn list_memory_records_missing_embedding(
        &self,
        project_tag: Option<ProjectTag>,
    ) -> Result<Vec<MemoryRecord>> {
        let reader = self.reader.lock().unwrap();
        let base = "SELECT m.session_id, m.project_tag, m.title, m.summary_short, m.summary_detailed,
                    m.memory_snippet, m.tags, m.key_topics, m.key_entities, m.indexer_model,
                    m.version, m.indexed_at
             FROM memory_records m
             LEFT JOIN memory_embeddings e ON e.session_id = m.session_id
             WHERE e.session_id IS NULL";
        let rows = match project_tag {
            Some(tag) => {
                let mut stmt =
                    reader.prepare(&format!("{base} AND m.project_tag = ?1"))?;
                stmt.query_map(params![tag.as_str()], row_to_memory_record)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = reader.prepare(base)?;
                stmt.query_map([], row_to_memory_record)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    #[cfg(feature = "vector-search")]
    pub fn search_memory_vector(
        &self,
        project_tag: ProjectTag,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        let hits = {
            let index = self
                .memory_vectors
                .lock()
                .map_err(|_| StorageError::NotFound("memory vector index lock poisoned".into()))?;
            index
                .search(query_vector, top_k * 4)
                .map_err(StorageError::VectorSearch)?
        };

        let mut results = Vec::with_capacity(top_k);
        for (id, score) in hits {
            if let Some(record) = self.get_memory_record(&id)? {
                if record.project_tag == project_tag {
                    results.push((record, score));
                }
            }
            if results.len() >= top_k {
                break;
            }
        }
        Ok(results)
    }

    /// Session ids of every memory record with no stored embedding for
    /// `project_tag` (or any project if `None`) — backs `backfill-embeddings`.
    #[cfg(feature = "vector-search")]
    pub fn list_memory_records_missing_embedding_vectors(
        &self,
        project_tag: Option<ProjectTag>,
    ) -> Result<Vec<MemoryRecord>> {
        self.list_memory_records_missing_embedding(project_tag)
    }

    // ------------------------------------------------------------------
    // Code index
    // ------------------------------------------------------------------

    pub fn get_repository_metadata(&self, repository_id: &str) -> Result<Option<RepositoryMetadata>> {
        let reader = self.reader.lock().unwrap();
        reader
            .query_row(
                "SELECT repository_id, root_path, last_indexed_commit, last_indexed_at, production_targets
                 FROM repository_metadata WHERE repository_id = ?1",
                params![repository_id],
                row_to_repository_metadata,
            )
            .optional()
            .map_err(StorageError::from)
    }

    pub fn upsert_repository_metadata(&self, meta: &RepositoryMetadata) -> Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.execute(
            "INSERT INTO repository_metadata
                (repository_id, root_path, last_indexed_commit, last_indexed_at, production_targets)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(repository_id) DO UPDATE SET
                root_path = excluded.root_path,
                last_indexed_commit = excluded.last_indexed_commit,
                last_indexed_at = excluded.last_indexed_at,
                production_targets = excluded.production_targets",
            params![
                meta.repository_id,
                meta.root_path,
                meta.last_indexed_commit,
                meta.last_indexed_at.map(|t| t.to_rfc3339()),
                serde_json::to_string(&meta.production_targets)?,
            ],
        )?;
        Ok(())
    }

    pub fn insert_code_chunk(&self, chunk: &CodeChunk, embedding: Option<&[f32]>) -> Result<()> {
        {
            let writer = self.writer.lock().unwrap();
            writer.execute(
                "INSERT INTO code_chunks
                    (id, repository_id, file_path, language, function_name, class_name,
                     docstring, code, embedding_text, start_line, end_line, production_targets, created_at, is_async)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    chunk.id,
                    chunk.repository_id,
                    chunk.file_path,
                    chunk.language,
                    chunk.function_name,
                    chunk.class_name,
                    chunk.docstring,
                    chunk.code,
                    chunk.embedding_text,
                    chunk.start_line,
                    chunk.end_line,
                    serde_json::to_string(&chunk.production_targets)?,
                    chunk.created_at.to_rfc3339(),
                    chunk.is_async,
                ],
            )?;

            #[cfg(feature = "vector-search")]
            if let Some(embedding) = embedding {
                let bytes = vector_to_bytes(embedding);
                writer.execute(
                    "INSERT INTO code_chunk_embeddings (chunk_id, embedding, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![chunk.id, bytes, Utc::now().to_rfc3339()],
                )?;
            }
        }

        #[cfg(feature = "vector-search")]
        if let Some(embedding) = embedding {
            let mut index = self
                .code_vectors
                .lock()
                .map_err(|_| StorageError::NotFound("code vector index lock poisoned".into()))?;
            index
                .add(&chunk.id, embedding)
                .map_err(StorageError::VectorSearch)?;
        }

        Ok(())
    }

    /// Set (or replace) a single code chunk's embedding, used by
    /// `backfill-code-embeddings`.
    #[cfg(feature = "vector-search")]
    pub fn set_code_chunk_embedding(&self, chunk_id: &str, embedding: &[f32]) -> Result<()> {
        let bytes = vector_to_bytes(embedding);
        {
            let writer = self.writer.lock().unwrap();
            writer.execute(
                "INSERT INTO code_chunk_embeddings (chunk_id, embedding, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(chunk_id) DO UPDATE SET embedding = excluded.embedding",
                params![chunk_id, bytes, Utc::now().to_rfc3339()],
            )?;
        }
        let mut index = self
            .code_vectors
            .lock()
            .map_err(|_| StorageError::NotFound("code vector index lock poisoned".into()))?;
        let _ = index.remove(chunk_id);
        index
            .add(chunk_id, embedding)
            .map_err(StorageError::VectorSearch)?;
        Ok(())
    }

    /// Delete every chunk previously indexed for `repository_id`, used
    /// before a full re-index.
    pub fn delete_code_chunks_for_repository(&self, repository_id: &str) -> Result<()> {
        let ids: Vec<String> = {
            let reader = self.reader.lock().unwrap();
            let mut stmt =
                reader.prepare("SELECT id FROM code_chunks WHERE repository_id = ?1")?;
            stmt.query_map(params![repository_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        {
            let writer = self.writer.lock().unwrap();
            writer.execute(
                "DELETE FROM code_chunks WHERE repository_id = ?1",
                params![repository_id],
            )?;
        }

        #[cfg(feature = "vector-search")]
        {
            let mut index = self
                .code_vectors
                .lock()
                .map_err(|_| StorageError::NotFound("code vector index lock poisoned".into()))?;
            for id in ids {
                let _ = index.remove(&id);
            }
        }

        Ok(())
    }

    fn get_code_chunk(&self, chunk_id: &str) -> Result<Option<CodeChunk>> {
        let reader = self.reader.lock().unwrap();
        reader
            .query_row(
                "SELECT id, repository_id, file_path, language, function_name, class_name,
                        docstring, code, embedding_text, start_line, end_line, production_targets, created_at, is_async
                 FROM code_chunks WHERE id = ?1",
                params![chunk_id],
                row_to_code_chunk,
            )
            .optional()
            .map_err(StorageError::from)
    }

    /// Code chunks with no stored embedding, used by
    /// `backfill-code-embeddings`.
    pub fn list_code_chunks_missing_embedding(
        &self,
        repository_id: Option<&str>,
    ) -> Result<Vec<CodeChunk>> {
        let reader = self.reader.lock().unwrap();
        let base = "SELECT c.id, c.repository_id, c.file_path, c.language, c.function_name,
                    c.class_name, c.docstring, c.code, c.embedding_text, c.start_line,
                    c.end_line, c.production_targets, c.created_at, c.is_async
             FROM code_chunks c
             LEFT JOIN code_chunk_embeddings e ON e.chunk_id = c.id
             WHERE e.chunk_id IS NULL";
        let rows = match repository_id {
            Some(repo) => {
                let mut stmt = reader.prepare(&format!("{base} AND c.repository_id = ?1"))?;
                stmt.query_map(params![repo], row_to_code_chunk)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = reader.prepare(base)?;
                stmt.query_map([], row_to_code_chunk)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    /// Vector-topK over code chunks, optionally filtered by repository
    /// name and/or a required production target. Over-fetches from the
    /// HNSW index since filters are applied after the ANN search.
    #[cfg(feature = "vector-search")]
    pub fn search_code_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
        repository_filter: Option<&[String]>,
        production_filter: Option<&str>,
    ) -> Result<Vec<(CodeChunk, f32)>> {
        let fetch_n = if repository_filter.is_some() || production_filter.is_some() {
            (top_k * 8).max(top_k)
        } else {
            top_k
        };

        let hits = {
            let index = self
                .code_vectors
                .lock()
                .map_err(|_| StorageError::NotFound("code vector index lock poisoned".into()))?;
            index
                .search(query_vector, fetch_n)
                .map_err(StorageError::VectorSearch)?
        };

        let mut results = Vec::with_capacity(top_k);
        for (id, score) in hits {
            let Some(chunk) = self.get_code_chunk(&id)? else {
                continue;
            };
            if let Some(repos) = repository_filter {
                if !repos.iter().any(|r| r == &chunk.repository_id) {
                    continue;
                }
            }
            if let Some(target) = production_filter {
                if !chunk.production_targets.iter().any(|t| t == target) {
                    continue;
                }
            }
            results.push((chunk, score));
            if results.len() >= top_k {
                break;
            }
        }
        Ok(results)
    }
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn str_to_role(s: &str) -> Role {
    match s {
        "assistant" => Role::Assistant,
        "system" => Role::System,
        _ => Role::User,
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let project_tag: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Session {
        id: row.get(0)?,
        title: row.get(1)?,
        project_tag: crate::project::normalize_project_tag(&project_tag),
        indexed: row.get(3)?,
        created_at: parse_rfc3339(&created_at),
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    let meta_json: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: str_to_role(&role),
        content: row.get(3)?,
        meta: serde_json::from_str::<MessageMeta>(&meta_json).unwrap_or_default(),
        created_at: parse_rfc3339(&created_at),
    })
}

fn row_to_memory_record(row: &rusqlite::Row) -> rusqlite::Result<MemoryRecord> {
    let project_tag: String = row.get(1)?;
    let tags: String = row.get(6)?;
    let key_topics: String = row.get(7)?;
    let key_entities: String = row.get(8)?;
    let indexed_at: String = row.get(11)?;

    Ok(MemoryRecord {
        session_id: row.get(0)?,
        project_tag: crate::project::normalize_project_tag(&project_tag),
        title: row.get(2)?,
        summary_short: row.get(3)?,
        summary_detailed: row.get(4)?,
        memory_snippet: row.get(5)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        key_topics: serde_json::from_str(&key_topics).unwrap_or_default(),
        key_entities: serde_json::from_str::<KeyEntities>(&key_entities).unwrap_or_default(),
        indexer_model: row.get(9)?,
        version: row.get(10)?,
        indexed_at: parse_rfc3339(&indexed_at),
    })
}

fn row_to_repository_metadata(row: &rusqlite::Row) -> rusqlite::Result<RepositoryMetadata> {
    let last_indexed_at: Option<String> = row.get(3)?;
    let production_targets: String = row.get(4)?;
    Ok(RepositoryMetadata {
        repository_id: row.get(0)?,
        root_path: row.get(1)?,
        last_indexed_commit: row.get(2)?,
        last_indexed_at: last_indexed_at.map(|s| parse_rfc3339(&s)),
        production_targets: serde_json::from_str(&production_targets).unwrap_or_default(),
    })
}

fn row_to_code_chunk(row: &rusqlite::Row) -> rusqlite::Result<CodeChunk> {
    let production_targets: String = row.get(11)?;
    let created_at: String = row.get(12)?;
    Ok(CodeChunk {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        file_path: row.get(2)?,
        language: row.get(3)?,
        function_name: row.get(4)?,
        class_name: row.get(5)?,
        docstring: row.get(6)?,
        code: row.get(7)?,
        embedding_text: row.get(8)?,
        start_line: row.get(9)?,
        end_line: row.get(10)?,
        production_targets: serde_json::from_str(&production_targets).unwrap_or_default(),
        created_at: parse_rfc3339(&created_at),
        is_async: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MessageMeta;

    fn store() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    fn test_record(session_id: &str, project_tag: ProjectTag, title: &str) -> MemoryRecord {
        MemoryRecord {
            session_id: session_id.into(),
            project_tag,
            title: title.into(),
            summary_short: "short".into(),
            summary_detailed: "detailed".into(),
            memory_snippet: "snippet".into(),
            tags: vec![],
            key_topics: vec![],
            key_entities: KeyEntities::default(),
            indexer_model: "llama3.1".into(),
            version: 1,
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn session_roundtrip() {
        let storage = store();
        let session = Session::new("s1", "first chat", ProjectTag::Thn);
        storage.upsert_session(&session).unwrap();
        let loaded = storage.get_session("s1").unwrap().unwrap();
        assert_eq!(loaded.project_tag, ProjectTag::Thn);
        assert_eq!(loaded.title, "first chat");
        assert!(!loaded.indexed);
    }

    #[test]
    fn message_append_and_load_preserves_order() {
        let storage = store();
        let session = Session::new("s1", "chat", ProjectTag::General);
        storage.upsert_session(&session).unwrap();

        for (i, content) in ["first", "second", "third"].iter().enumerate() {
            let msg = Message {
                id: format!("m{i}"),
                session_id: "s1".into(),
                role: Role::User,
                content: content.to_string(),
                meta: MessageMeta::default(),
                created_at: Utc::now() + chrono::Duration::seconds(i as i64),
            };
            storage.append_message(&msg).unwrap();
        }

        let loaded = storage.load_messages("s1").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].content, "first");
        assert_eq!(loaded[2].content, "third");
    }

    #[test]
    fn memory_record_title_search_is_case_insensitive() {
        let storage = store();
        let session = Session::new("s1", "chat", ProjectTag::Daas);
        storage.upsert_session(&session).unwrap();

        let record = test_record("s1", ProjectTag::Daas, "The Lighthouse Keeper");
        storage.upsert_memory_record(&record).unwrap();

        let hits = storage
            .search_memory_title(ProjectTag::Daas, "lighthouse keeper", 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session_id, "s1");
    }

    #[test]
    fn deleting_memory_record_removes_it() {
        let storage = store();
        let session = Session::new("s1", "chat", ProjectTag::Daas);
        storage.upsert_session(&session).unwrap();
        let record = test_record("s1", ProjectTag::Daas, "x");
        storage.upsert_memory_record(&record).unwrap();
        assert!(storage.delete_memory_record("s1").unwrap());
        assert!(storage.get_memory_record("s1").unwrap().is_none());
    }

    #[test]
    fn upsert_memory_record_is_idempotent_on_session_id() {
        let storage = store();
        let session = Session::new("s1", "chat", ProjectTag::Thn);
        storage.upsert_session(&session).unwrap();
        storage
            .upsert_memory_record(&test_record("s1", ProjectTag::Thn, "first pass"))
            .unwrap();
        storage
            .upsert_memory_record(&test_record("s1", ProjectTag::Thn, "second pass"))
            .unwrap();

        let all = storage.list_memory_records(Some(ProjectTag::Thn), 10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "second pass");
    }
}
