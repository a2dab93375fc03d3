//! SQLite backend for the relational store

use super::traits::{RelationalStore, StorageError, StorageResult};
use crate::model::{
    Mention, OperationStatus, ProvenanceRecord, SurfaceForm, ToolStatistics, WorkflowCheckpoint,
};
use crate::reference::{ObjectType, UniversalReference};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed relational store
///
/// Single database file with tables for documents, chunks, surface forms,
/// mentions, operations (plus input/output join tables), tool statistics,
/// and workflow checkpoints. Thread-safe via an internal mutex on the
/// connection; minting atomicity rides on `INSERT OR IGNORE` against primary
/// keys, and the operation status transition is a guarded `UPDATE`.
pub struct SqliteRelationalStore {
    conn: Mutex<Connection>,
}

impl SqliteRelationalStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- External roots
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT,
                created_at TEXT NOT NULL
            );

            -- Surface forms (content-hash ids make minting idempotent)
            CREATE TABLE IF NOT EXISTS surface_forms (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                context TEXT NOT NULL,
                source_chunk_ref TEXT NOT NULL,
                start_offset INTEGER NOT NULL,
                end_offset INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_surface_forms_chunk
                ON surface_forms(source_chunk_ref);

            -- Mentions
            CREATE TABLE IF NOT EXISTS mentions (
                id TEXT PRIMARY KEY,
                surface_form_ref TEXT NOT NULL,
                mention_type TEXT NOT NULL,
                attributes_json TEXT NOT NULL,
                confidence REAL NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mentions_surface_form
                ON mentions(surface_form_ref);

            -- Provenance records
            CREATE TABLE IF NOT EXISTS operations (
                id TEXT PRIMARY KEY,
                operation_type TEXT NOT NULL,
                tool_id TEXT NOT NULL,
                parameters_json TEXT NOT NULL,
                status TEXT NOT NULL,
                confidence REAL,
                duration_ms INTEGER,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error_message TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_operations_tool
                ON operations(tool_id);
            CREATE INDEX IF NOT EXISTS idx_operations_status
                ON operations(status);

            CREATE TABLE IF NOT EXISTS operation_inputs (
                operation_id TEXT NOT NULL,
                ref TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (operation_id, position),
                FOREIGN KEY (operation_id) REFERENCES operations(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_operation_inputs_ref
                ON operation_inputs(ref);

            CREATE TABLE IF NOT EXISTS operation_outputs (
                operation_id TEXT NOT NULL,
                ref TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (operation_id, position),
                FOREIGN KEY (operation_id) REFERENCES operations(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_operation_outputs_ref
                ON operation_outputs(ref);

            -- Per-tool aggregates
            CREATE TABLE IF NOT EXISTS tool_stats (
                tool_id TEXT PRIMARY KEY,
                total_calls INTEGER NOT NULL DEFAULT 0,
                successful_calls INTEGER NOT NULL DEFAULT 0,
                failed_calls INTEGER NOT NULL DEFAULT 0,
                total_duration_ms INTEGER NOT NULL DEFAULT 0,
                last_used TEXT
            );

            -- Workflow checkpoints (one row per workflow)
            CREATE TABLE IF NOT EXISTS checkpoints (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL UNIQUE,
                workflow_type TEXT NOT NULL,
                status TEXT NOT NULL,
                step_number INTEGER NOT NULL,
                total_steps INTEGER NOT NULL,
                state_json TEXT NOT NULL,
                completed_ops_json TEXT NOT NULL,
                failed_ops_json TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL keeps lineage/statistics reads consistent during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    /// Load one operation's join rows, ordered by position.
    fn load_refs(
        conn: &Connection,
        table: &str,
        operation_id: &str,
    ) -> StorageResult<Vec<UniversalReference>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT ref FROM {} WHERE operation_id = ?1 ORDER BY position",
            table
        ))?;
        let rows = stmt.query_map(params![operation_id], |row| row.get::<_, String>(0))?;
        let mut refs = Vec::new();
        for row in rows {
            refs.push(parse_ref(&row?)?);
        }
        Ok(refs)
    }

    /// Replace an operation's join rows in the given table.
    fn write_refs(
        conn: &Connection,
        table: &str,
        operation_id: &str,
        refs: &[UniversalReference],
    ) -> StorageResult<()> {
        conn.execute(
            &format!("DELETE FROM {} WHERE operation_id = ?1", table),
            params![operation_id],
        )?;
        let mut stmt = conn.prepare(&format!(
            "INSERT INTO {} (operation_id, ref, position) VALUES (?1, ?2, ?3)",
            table
        ))?;
        for (position, r) in refs.iter().enumerate() {
            stmt.execute(params![operation_id, r.to_string(), position as i64])?;
        }
        Ok(())
    }

    /// Load a full record: operations row plus both join tables.
    fn load_operation(conn: &Connection, id: &str) -> StorageResult<Option<ProvenanceRecord>> {
        let row = conn
            .query_row(
                "SELECT id, operation_type, tool_id, parameters_json, status, confidence,
                        duration_ms, started_at, completed_at, error_message
                 FROM operations WHERE id = ?1",
                params![id],
                map_operation_row,
            )
            .optional()?;

        let Some(partial) = row else {
            return Ok(None);
        };
        let mut record = finish_operation_row(partial)?;
        record.input_refs = Self::load_refs(conn, "operation_inputs", id)?;
        record.output_refs = Self::load_refs(conn, "operation_outputs", id)?;
        Ok(Some(record))
    }

    /// Load records for a list of ids, preserving the given order.
    fn load_operations(
        conn: &Connection,
        ids: &[String],
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = Self::load_operation(conn, id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Ids of operations joined on a ref column, ordered by start time.
    fn operation_ids_by_ref(
        conn: &Connection,
        join_table: &str,
        r: &UniversalReference,
    ) -> StorageResult<Vec<String>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT o.id FROM operations o
             JOIN {} j ON j.operation_id = o.id
             WHERE j.ref = ?1 ORDER BY o.started_at",
            join_table
        ))?;
        let rows = stmt.query_map(params![r.to_string()], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}

/// Columns of one operations row, before join tables are attached.
type OperationRow = (
    String,
    String,
    String,
    String,
    String,
    Option<f64>,
    Option<i64>,
    String,
    Option<String>,
    Option<String>,
);

fn map_operation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OperationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn finish_operation_row(row: OperationRow) -> StorageResult<ProvenanceRecord> {
    let (
        id,
        operation_type,
        tool_id,
        parameters_json,
        status,
        confidence,
        duration_ms,
        started_at,
        completed_at,
        error_message,
    ) = row;
    Ok(ProvenanceRecord {
        id,
        operation_type,
        tool_id,
        input_refs: Vec::new(),
        output_refs: Vec::new(),
        parameters: serde_json::from_str(&parameters_json)?,
        status: status
            .parse::<OperationStatus>()
            .map_err(StorageError::InvalidInput)?,
        confidence: confidence.map(|c| c as f32),
        duration_ms,
        started_at: parse_ts(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_ts).transpose()?,
        error_message,
    })
}

fn parse_ts(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::DateParse(e.to_string()))
}

fn parse_ref(s: &str) -> StorageResult<UniversalReference> {
    UniversalReference::parse(s).map_err(|e| StorageError::InvalidInput(e.to_string()))
}

impl RelationalStore for SqliteRelationalStore {
    fn register_document(&self, id: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO documents (id, created_at) VALUES (?1, ?2)",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn register_chunk(&self, id: &str, document_id: Option<&str>) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO chunks (id, document_id, created_at) VALUES (?1, ?2, ?3)",
            params![id, document_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn mint_surface_form(&self, form: &SurfaceForm) -> StorageResult<SurfaceForm> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO surface_forms
             (id, text, context, source_chunk_ref, start_offset, end_offset, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                form.id,
                form.text,
                form.context,
                form.source_chunk_ref.to_string(),
                form.start_offset as i64,
                form.end_offset as i64,
                form.created_at.to_rfc3339(),
            ],
        )?;
        // Return the stored row: the winner's on a lost race.
        let stored = conn.query_row(
            "SELECT id, text, context, source_chunk_ref, start_offset, end_offset, created_at
             FROM surface_forms WHERE id = ?1",
            params![form.id],
            map_surface_form_row,
        )?;
        finish_surface_form_row(stored)
    }

    fn get_surface_form(&self, id: &str) -> StorageResult<Option<SurfaceForm>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, text, context, source_chunk_ref, start_offset, end_offset, created_at
                 FROM surface_forms WHERE id = ?1",
                params![id],
                map_surface_form_row,
            )
            .optional()?;
        row.map(finish_surface_form_row).transpose()
    }

    fn mint_mention(&self, mention: &Mention) -> StorageResult<Mention> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO mentions
             (id, surface_form_ref, mention_type, attributes_json, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                mention.id,
                mention.surface_form_ref.to_string(),
                mention.mention_type,
                serde_json::to_string(&mention.attributes)?,
                mention.confidence as f64,
                mention.created_at.to_rfc3339(),
            ],
        )?;
        let stored = conn.query_row(
            "SELECT id, surface_form_ref, mention_type, attributes_json, confidence, created_at
             FROM mentions WHERE id = ?1",
            params![mention.id],
            map_mention_row,
        )?;
        finish_mention_row(stored)
    }

    fn get_mention(&self, id: &str) -> StorageResult<Option<Mention>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, surface_form_ref, mention_type, attributes_json, confidence, created_at
                 FROM mentions WHERE id = ?1",
                params![id],
                map_mention_row,
            )
            .optional()?;
        row.map(finish_mention_row).transpose()
    }

    fn update_mention(&self, mention: &Mention) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE mentions SET attributes_json = ?2, confidence = ?3 WHERE id = ?1",
            params![
                mention.id,
                serde_json::to_string(&mention.attributes)?,
                mention.confidence as f64,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("mention {}", mention.id)));
        }
        Ok(())
    }

    fn insert_operation(&self, record: &ProvenanceRecord) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO operations
             (id, operation_type, tool_id, parameters_json, status, confidence,
              duration_ms, started_at, completed_at, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.operation_type,
                record.tool_id,
                serde_json::to_string(&record.parameters)?,
                record.status.as_str(),
                record.confidence.map(|c| c as f64),
                record.duration_ms,
                record.started_at.to_rfc3339(),
                record.completed_at.map(|t| t.to_rfc3339()),
                record.error_message,
            ],
        )?;
        if inserted == 0 {
            return Err(StorageError::Conflict(format!(
                "operation {} already exists",
                record.id
            )));
        }
        Self::write_refs(&tx, "operation_inputs", &record.id, &record.input_refs)?;
        tx.commit()?;
        Ok(())
    }

    fn get_operation(&self, id: &str) -> StorageResult<Option<ProvenanceRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::load_operation(&conn, id)
    }

    fn transition_operation(&self, record: &ProvenanceRecord) -> StorageResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        // One-shot by construction: the guarded UPDATE only matches while
        // the row is still running.
        let changed = tx.execute(
            "UPDATE operations
             SET status = ?2, confidence = ?3, duration_ms = ?4,
                 completed_at = ?5, error_message = ?6
             WHERE id = ?1 AND status = 'running'",
            params![
                record.id,
                record.status.as_str(),
                record.confidence.map(|c| c as f64),
                record.duration_ms,
                record.completed_at.map(|t| t.to_rfc3339()),
                record.error_message,
            ],
        )?;
        if changed == 0 {
            let exists: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM operations WHERE id = ?1",
                params![record.id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StorageError::NotFound(format!("operation {}", record.id)));
            }
            return Ok(false);
        }
        Self::write_refs(&tx, "operation_outputs", &record.id, &record.output_refs)?;
        tx.commit()?;
        Ok(true)
    }

    fn operations_producing(
        &self,
        r: &UniversalReference,
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        let conn = self.conn.lock().unwrap();
        let ids = Self::operation_ids_by_ref(&conn, "operation_outputs", r)?;
        Self::load_operations(&conn, &ids)
    }

    fn operations_consuming(
        &self,
        r: &UniversalReference,
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        let conn = self.conn.lock().unwrap();
        let ids = Self::operation_ids_by_ref(&conn, "operation_inputs", r)?;
        Self::load_operations(&conn, &ids)
    }

    fn operations_by_status(
        &self,
        status: OperationStatus,
    ) -> StorageResult<Vec<ProvenanceRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id FROM operations WHERE status = ?1 ORDER BY started_at",
        )?;
        let rows = stmt.query_map(params![status.as_str()], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        drop(stmt);
        Self::load_operations(&conn, &ids)
    }

    fn record_tool_call(
        &self,
        tool_id: &str,
        success: bool,
        duration_ms: i64,
    ) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tool_stats
             (tool_id, total_calls, successful_calls, failed_calls, total_duration_ms, last_used)
             VALUES (?1, 1, ?2, ?3, ?4, ?5)
             ON CONFLICT(tool_id) DO UPDATE SET
                total_calls = total_calls + 1,
                successful_calls = successful_calls + excluded.successful_calls,
                failed_calls = failed_calls + excluded.failed_calls,
                total_duration_ms = total_duration_ms + excluded.total_duration_ms,
                last_used = excluded.last_used",
            params![
                tool_id,
                if success { 1 } else { 0 },
                if success { 0 } else { 1 },
                duration_ms,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_tool_statistics(&self, tool_id: &str) -> StorageResult<Option<ToolStatistics>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT tool_id, total_calls, successful_calls, failed_calls,
                        total_duration_ms, last_used
                 FROM tool_stats WHERE tool_id = ?1",
                params![tool_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;
        let Some((tool_id, total, successful, failed, total_duration, last_used)) = row else {
            return Ok(None);
        };
        Ok(Some(ToolStatistics {
            tool_id,
            total_calls: total as u64,
            successful_calls: successful as u64,
            failed_calls: failed as u64,
            total_duration_ms: total_duration,
            last_used: last_used.as_deref().map(parse_ts).transpose()?,
        }))
    }

    fn save_checkpoint(&self, checkpoint: &WorkflowCheckpoint) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO checkpoints
             (id, workflow_id, workflow_type, status, step_number, total_steps,
              state_json, completed_ops_json, failed_ops_json, metadata_json,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(workflow_id) DO UPDATE SET
                status = excluded.status,
                step_number = excluded.step_number,
                state_json = excluded.state_json,
                completed_ops_json = excluded.completed_ops_json,
                failed_ops_json = excluded.failed_ops_json,
                metadata_json = excluded.metadata_json,
                updated_at = excluded.updated_at",
            params![
                checkpoint.id,
                checkpoint.workflow_id,
                checkpoint.workflow_type,
                checkpoint.status.as_str(),
                checkpoint.step_number as i64,
                checkpoint.total_steps as i64,
                serde_json::to_string(&checkpoint.state_data)?,
                serde_json::to_string(&checkpoint.completed_operation_ids)?,
                serde_json::to_string(&checkpoint.failed_operation_ids)?,
                serde_json::to_string(&checkpoint.metadata)?,
                checkpoint.created_at.to_rfc3339(),
                checkpoint.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_checkpoint(&self, workflow_id: &str) -> StorageResult<Option<WorkflowCheckpoint>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, workflow_id, workflow_type, status, step_number, total_steps,
                        state_json, completed_ops_json, failed_ops_json, metadata_json,
                        created_at, updated_at
                 FROM checkpoints WHERE workflow_id = ?1",
                params![workflow_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, String>(9)?,
                        row.get::<_, String>(10)?,
                        row.get::<_, String>(11)?,
                    ))
                },
            )
            .optional()?;
        let Some((
            id,
            workflow_id,
            workflow_type,
            status,
            step_number,
            total_steps,
            state_json,
            completed_json,
            failed_json,
            metadata_json,
            created_at,
            updated_at,
        )) = row
        else {
            return Ok(None);
        };
        Ok(Some(WorkflowCheckpoint {
            id,
            workflow_id,
            workflow_type,
            status: status.parse().map_err(StorageError::InvalidInput)?,
            step_number: step_number as u32,
            total_steps: total_steps as u32,
            state_data: serde_json::from_str(&state_json)?,
            completed_operation_ids: serde_json::from_str(&completed_json)?,
            failed_operation_ids: serde_json::from_str(&failed_json)?,
            metadata: serde_json::from_str(&metadata_json)?,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        }))
    }

    fn ref_exists(&self, r: &UniversalReference) -> StorageResult<bool> {
        let table = match r.object_type() {
            ObjectType::Document => "documents",
            ObjectType::Chunk => "chunks",
            ObjectType::SurfaceForm => "surface_forms",
            ObjectType::Mention => "mentions",
            ObjectType::Operation => "operations",
            ObjectType::Checkpoint => "checkpoints",
            ObjectType::Entity | ObjectType::Vector => return Ok(false),
        };
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            &format!("SELECT COUNT(*) > 0 FROM {} WHERE id = ?1", table),
            params![r.id()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

type SurfaceFormRow = (String, String, String, String, i64, i64, String);

fn map_surface_form_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SurfaceFormRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn finish_surface_form_row(row: SurfaceFormRow) -> StorageResult<SurfaceForm> {
    let (id, text, context, source_chunk_ref, start_offset, end_offset, created_at) = row;
    Ok(SurfaceForm {
        id,
        text,
        context,
        source_chunk_ref: parse_ref(&source_chunk_ref)?,
        start_offset: start_offset as usize,
        end_offset: end_offset as usize,
        created_at: parse_ts(&created_at)?,
    })
}

type MentionRow = (String, String, String, String, f64, String);

fn map_mention_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MentionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn finish_mention_row(row: MentionRow) -> StorageResult<Mention> {
    let (id, surface_form_ref, mention_type, attributes_json, confidence, created_at) = row;
    Ok(Mention {
        id,
        surface_form_ref: parse_ref(&surface_form_ref)?,
        mention_type,
        attributes: serde_json::from_str(&attributes_json)?,
        confidence: confidence as f32,
        created_at: parse_ts(&created_at)?,
    })
}
