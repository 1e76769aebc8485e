// ==========================================
// 建筑能耗模型转换系统 - 转换结果台账仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 并发: WAL + busy_timeout + 有界重试退避;单行 INSERT 原子,
//       台账行要么完整存在要么不存在,绝无半行
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::outcome::{FailureBreakdownRow, OutcomeRecord};
use crate::domain::types::OutcomeStatus;
use crate::repository::error::{StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// 写入重试次数上限
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// 重试退避基数(毫秒),按尝试次数线性放大
const RETRY_BACKOFF_BASE_MS: u64 = 50;

// ==========================================
// OutcomeRecordRepository - 台账仓储接口
// ==========================================

#[async_trait]
pub trait OutcomeRecordRepository: Send + Sync {
    /// 追加一行台账(每个输入文件恰好一次)
    async fn insert(&self, record: &OutcomeRecord) -> StoreResult<()>;

    /// 台账总行数
    async fn count_records(&self) -> StoreResult<i64>;

    /// 按状态计数
    async fn count_by_status(&self, status: OutcomeStatus) -> StoreResult<i64>;

    /// 失败归因统计(按 error_type / error_category 分组)
    async fn failure_breakdown(&self) -> StoreResult<Vec<FailureBreakdownRow>>;

    /// 按状态列出台账行
    async fn list_by_status(
        &self,
        status: OutcomeStatus,
        limit: i64,
    ) -> StoreResult<Vec<OutcomeRecord>>;
}

// ==========================================
// OutcomeRecordRepositoryImpl - SQLite 实现
// ==========================================

pub struct OutcomeRecordRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl OutcomeRecordRepositoryImpl {
    /// 打开(或创建)台账数据库并初始化 schema
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        let db_path_str = db_path.to_string_lossy();
        let conn = open_sqlite_connection(&db_path_str)
            .map_err(|e| StoreError::DatabaseConnectionError(e.to_string()))?;

        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    /// 从已有连接创建(测试用)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let repo = Self { conn };
        repo.init_schema()?;
        Ok(repo)
    }

    /// 获取数据库连接
    fn get_conn(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 初始化台账表
    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS processing_results (
                id               TEXT PRIMARY KEY,
                filepath         TEXT NOT NULL,
                filename         TEXT NOT NULL,
                directory        TEXT NOT NULL,
                status           TEXT NOT NULL CHECK (status IN ('Success', 'Failure')),
                start_time       TEXT NOT NULL,
                end_time         TEXT NOT NULL,
                duration_seconds REAL NOT NULL,
                output_path      TEXT,
                error_message    TEXT,
                error_type       TEXT,
                error_category   TEXT,
                warnings         TEXT NOT NULL DEFAULT '[]',
                processed_at     TEXT NOT NULL,
                worker_id        TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_processing_results_status
                ON processing_results(status);
            CREATE INDEX IF NOT EXISTS idx_processing_results_error_type
                ON processing_results(error_type);
            "#,
        )?;
        Ok(())
    }

    /// 单次插入(不含重试)
    fn insert_once(conn: &Connection, record: &OutcomeRecord) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO processing_results (
                id, filepath, filename, directory, status,
                start_time, end_time, duration_seconds,
                output_path, error_message, error_type, error_category,
                warnings, processed_at, worker_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.id,
                record.filepath,
                record.filename,
                record.directory,
                record.status.to_string(),
                record.start_time,
                record.end_time,
                record.duration_seconds,
                record.output_path,
                record.error_message,
                record.error_type,
                record.error_category,
                record.warnings,
                record.processed_at,
                record.worker_id,
            ],
        )?;
        Ok(())
    }

    /// 行 → 实体映射
    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<OutcomeRecord> {
        let status_str: String = row.get("status")?;
        let status = OutcomeStatus::parse(&status_str).unwrap_or(OutcomeStatus::Failure);

        Ok(OutcomeRecord {
            id: row.get("id")?,
            filepath: row.get("filepath")?,
            filename: row.get("filename")?,
            directory: row.get("directory")?,
            status,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            duration_seconds: row.get("duration_seconds")?,
            output_path: row.get("output_path")?,
            error_message: row.get("error_message")?,
            error_type: row.get("error_type")?,
            error_category: row.get("error_category")?,
            warnings: row.get("warnings")?,
            processed_at: row.get("processed_at")?,
            worker_id: row.get("worker_id")?,
        })
    }
}

/// SQLite busy/locked 判定(重试条件)
fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

#[async_trait]
impl OutcomeRecordRepository for OutcomeRecordRepositoryImpl {
    async fn insert(&self, record: &OutcomeRecord) -> StoreResult<()> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            // 持锁范围只覆盖单条 INSERT,退避期间释放
            let result = {
                let conn = self.get_conn()?;
                Self::insert_once(&conn, record)
            };

            match result {
                Ok(()) => return Ok(()),
                Err(err) if is_busy(&err) && attempt < MAX_WRITE_ATTEMPTS => {
                    let backoff = Duration::from_millis(RETRY_BACKOFF_BASE_MS * attempt as u64);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        filepath = %record.filepath,
                        "台账写入遇忙,退避重试"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) if is_busy(&err) => {
                    return Err(StoreError::BusyAfterRetries {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn count_records(&self) -> StoreResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM processing_results", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    async fn count_by_status(&self, status: OutcomeStatus) -> StoreResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM processing_results WHERE status = ?1",
            params![status.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn failure_breakdown(&self) -> StoreResult<Vec<FailureBreakdownRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(error_type, 'Unknown')     AS error_type,
                   COALESCE(error_category, 'Unknown') AS error_category,
                   COUNT(*)                            AS cnt
            FROM processing_results
            WHERE status = 'Failure'
            GROUP BY error_type, error_category
            ORDER BY cnt DESC, error_type ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(FailureBreakdownRow {
                error_type: row.get(0)?,
                error_category: row.get(1)?,
                count: row.get(2)?,
            })
        })?;

        let mut breakdown = Vec::new();
        for row in rows {
            breakdown.push(row?);
        }
        Ok(breakdown)
    }

    async fn list_by_status(
        &self,
        status: OutcomeStatus,
        limit: i64,
    ) -> StoreResult<Vec<OutcomeRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM processing_results
            WHERE status = ?1
            ORDER BY processed_at ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![status.to_string(), limit], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
