use crate::config::TaskConfig;
use crate::model::{CaseMetadata, CaseStatus, ResultRow, RunSummary, TaskStatus};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

/// One row of the `status` overview.
#[derive(Debug, Clone)]
pub struct TaskOverviewRow {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub run_number: Option<i64>,
    pub status: TaskStatus,
    pub case_count: i64,
    pub created_at: String,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create db directory {}", dir.display()))?;
        }
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        migrate(&conn)?;
        Ok(())
    }

    /// Insert a new task row for this run. Every run gets its own row so
    /// historical runs of the same logical task stay queryable; the stored
    /// name is run-qualified with a timestamp.
    pub fn create_task(&self, cfg: &TaskConfig) -> anyhow::Result<i64> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let unique_name = format!("{}_{}", cfg.task_name, timestamp);
        let config_json = serde_json::to_string(cfg)?;

        let conn = self.conn.lock().unwrap();
        let prior: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE original_name = ?1",
            params![cfg.task_name],
            |r| r.get(0),
        )?;
        conn.execute(
            "INSERT INTO tasks (name, original_name, run_number, description, config_json, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                unique_name,
                cfg.task_name,
                prior + 1,
                cfg.description,
                config_json,
                TaskStatus::Pending.as_str()
            ],
        )
        .context("insert task")?;
        let task_id = conn.last_insert_rowid();
        tracing::info!(task_id, name = %unique_name, run = prior + 1, "task created");
        Ok(task_id)
    }

    /// Look up a suite by (task, name, model); insert it on first use.
    /// Callers cache the id per (suite, model) for the rest of the run.
    pub fn find_or_create_suite(
        &self,
        task_id: i64,
        suite_name: &str,
        model_name: &str,
        model_path: &str,
        suite_json: &str,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM suites WHERE task_id = ?1 AND name = ?2 AND model_name = ?3",
                params![task_id, suite_name, model_name],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO suites (task_id, name, model_name, model_path, suite_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![task_id, suite_name, model_name, model_path, suite_json],
        )
        .context("insert suite")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_or_create_case(
        &self,
        suite_id: i64,
        case_index: usize,
        params_json: &str,
    ) -> anyhow::Result<i64> {
        let name = format!("case_{case_index}");
        let conn = self.conn.lock().unwrap();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM case_definitions WHERE suite_id = ?1 AND name = ?2",
                params![suite_id, name],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO case_definitions (suite_id, name, base_parameters, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![suite_id, name, params_json, CaseStatus::Pending.as_str()],
        )
        .context("insert case definition")?;
        Ok(conn.last_insert_rowid())
    }

    /// Upsert one row per swept variable; re-running a case overwrites.
    pub fn write_variable_values(
        &self,
        case_id: i64,
        values: &BTreeMap<String, String>,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO case_variable_values (case_id, variable_name, variable_value)
             VALUES (?1, ?2, ?3)",
        )?;
        for (name, value) in values {
            if value.is_empty() {
                continue;
            }
            stmt.execute(params![case_id, name, value])?;
        }
        Ok(())
    }

    /// Upsert each measurement keyed (case, kind, parameter); a re-run of
    /// the same case replaces prior rows instead of duplicating them.
    pub fn write_results(&self, case_id: i64, rows: &[ResultRow]) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO benchmark_results
                     (case_id, result_type, result_parameter, mean_value, std_value, unit, ptypes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(case_id, result_type, result_parameter) DO UPDATE SET
                     mean_value = excluded.mean_value,
                     std_value = excluded.std_value,
                     unit = excluded.unit,
                     ptypes = excluded.ptypes",
            )?;
            for row in rows {
                stmt.execute(params![
                    case_id,
                    row.kind.as_str(),
                    row.parameter,
                    row.mean,
                    row.std,
                    row.unit,
                    row.prompt_type.as_str()
                ])?;
            }
        }
        tx.commit().context("write results")?;
        Ok(())
    }

    /// Record derived execution metadata and mark the case successful.
    /// Only called after a successful parse.
    pub fn update_case_execution(
        &self,
        case_id: i64,
        meta: &CaseMetadata,
        runtime_seconds: f64,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE case_definitions SET
                 model_size = ?1, backend = ?2, threads = ?3, precision = ?4,
                 execution_time_seconds = ?5, status = ?6
             WHERE id = ?7",
            params![
                meta.model_size,
                meta.backend,
                meta.threads,
                meta.precision,
                runtime_seconds,
                CaseStatus::Success.as_str(),
                case_id
            ],
        )
        .context("update case execution")?;
        Ok(())
    }

    /// Leave a failed or timed-out case queryable with its non-success
    /// status and measured runtime. No results are written for it.
    pub fn mark_case_failed(
        &self,
        case_id: i64,
        status: CaseStatus,
        runtime_seconds: f64,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE case_definitions SET status = ?1, execution_time_seconds = ?2 WHERE id = ?3",
            params![status.as_str(), runtime_seconds, case_id],
        )
        .context("mark case failed")?;
        Ok(())
    }

    /// Persist final status, summary and duration in one update.
    pub fn finalize_task(
        &self,
        task_id: i64,
        runtime_seconds: f64,
        summary: &RunSummary,
    ) -> anyhow::Result<()> {
        let status = summary.status();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE tasks SET status = ?1, summary_json = ?2, execution_time_seconds = ?3,
                              updated_at = CURRENT_TIMESTAMP
             WHERE id = ?4",
            params![
                status.as_str(),
                serde_json::to_string(summary)?,
                runtime_seconds,
                task_id
            ],
        )
        .context("finalize task")?;
        tracing::info!(task_id, status = status.as_str(), "task finalized");
        Ok(())
    }

    pub fn task_overview(&self, original_name: Option<&str>) -> anyhow::Result<Vec<TaskOverviewRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.original_name, t.run_number, t.status, t.created_at,
                    (SELECT COUNT(*) FROM case_definitions c
                      JOIN suites s ON c.suite_id = s.id
                      WHERE s.task_id = t.id)
             FROM tasks t
             WHERE ?1 IS NULL OR t.original_name = ?1
             ORDER BY t.id DESC",
        )?;
        let rows = stmt.query_map(params![original_name], |row| {
            Ok(TaskOverviewRow {
                id: row.get(0)?,
                name: row.get(1)?,
                original_name: row.get(2)?,
                run_number: row.get(3)?,
                status: TaskStatus::parse(&row.get::<_, String>(4)?),
                created_at: row.get(5)?,
                case_count: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn fetch_case_results(&self, case_id: i64) -> anyhow::Result<Vec<ResultRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT result_type, result_parameter, mean_value, std_value, unit, ptypes
             FROM benchmark_results WHERE case_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![case_id], |row| {
            Ok(ResultRow {
                kind: crate::model::ResultKind::parse(&row.get::<_, String>(0)?),
                parameter: row.get(1)?,
                mean: row.get(2)?,
                std: row.get(3)?,
                unit: row.get(4)?,
                prompt_type: crate::model::PromptType::parse(&row.get::<_, String>(5)?)
                    .unwrap_or(crate::model::PromptType::Fix),
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn delete_task(&self, task_id: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        Ok(())
    }

    pub fn count_rows(&self, table: &str) -> anyhow::Result<i64> {
        // Allowlist to keep table names out of SQL injection territory.
        const TABLES: &[&str] = &[
            "tasks",
            "suites",
            "case_definitions",
            "case_variable_values",
            "benchmark_results",
        ];
        if !TABLES.contains(&table) {
            anyhow::bail!("invalid table name for count_rows: {}", table);
        }
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let n: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(n)
    }
}

/// Add-column migrations for databases created by older builds.
fn migrate(conn: &Connection) -> anyhow::Result<()> {
    let task_cols = get_columns(conn, "tasks")?;
    add_column_if_missing(conn, &task_cols, "tasks", "original_name", "TEXT")?;
    add_column_if_missing(conn, &task_cols, "tasks", "run_number", "INTEGER")?;

    let case_cols = get_columns(conn, "case_definitions")?;
    add_column_if_missing(
        conn,
        &case_cols,
        "case_definitions",
        "execution_time_seconds",
        "REAL",
    )?;

    let result_cols = get_columns(conn, "benchmark_results")?;
    add_column_if_missing(conn, &result_cols, "benchmark_results", "ptypes", "TEXT")?;
    Ok(())
}

fn get_columns(
    conn: &Connection,
    table: &str,
) -> anyhow::Result<std::collections::HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut out = std::collections::HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

fn add_column_if_missing(
    conn: &Connection,
    cols: &std::collections::HashSet<String>,
    table: &str,
    col: &str,
    ty: &str,
) -> anyhow::Result<()> {
    if !cols.contains(col) {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, col, ty);
        conn.execute(&sql, [])?;
    }
    Ok(())
}
