//! ReportStore: SQLite-backed run records.
//!
//! Provides:
//! - Per-stage checkpoint writes, accepted only while a run is `analyzing`
//! - Monotonic status transitions (`analyzing -> completed | failed`)
//! - Paginated per-user listing, newest first
//! - Debug merge-patch restricted to terminal runs

use super::schema::REPORT_SCHEMA;
use crate::model::{Checkpoint, NewReport, RecordField, ReportRecord, RunStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Report not found: {run_id}")]
    NotFound { run_id: String },

    #[error("Report already exists: {run_id}")]
    AlreadyExists { run_id: String },

    #[error("Run {run_id} is {status}; only analyzing runs accept writes")]
    NotAnalyzing { run_id: String, status: RunStatus },

    #[error("Run {run_id} is still analyzing; patch refused")]
    StillAnalyzing { run_id: String },

    #[error("Unknown report field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Corrupt record {run_id}: {message}")]
    Corrupt { run_id: String, message: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Row of the per-user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub run_id: String,
    pub url: String,
    pub target_keyword: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub google_ranking: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReportPage {
    pub reports: Vec<ReportSummary>,
    pub total: u64,
}

const RECORD_COLUMNS: &str = "run_id, user_id, user_url, target_keyword, created_at, status, \
     failure_reason, payment_payer, payment_tx_hash, \
     user_site_data, discovered_keywords, google_ranking, competitor_data, patterns, \
     gaps, recommendations, score, report_data";

/// SQLite-backed report store.
#[derive(Clone)]
pub struct ReportStore {
    conn: Arc<Mutex<Connection>>,
}

impl ReportStore {
    /// Open a file-backed store, creating the file if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_connection(conn: &Connection) -> Result<(), StoreError> {
        // WAL mode for file-backed DBs (no-op for in-memory)
        let _ = conn.execute("PRAGMA journal_mode = WAL", []);
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(REPORT_SCHEMA)?;
        Ok(())
    }

    /// Insert a new run in `analyzing` state.
    pub fn create(&self, new: &NewReport) -> Result<ReportRecord, StoreError> {
        let created_at = Utc::now();
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO reports (run_id, user_id, user_url, target_keyword, created_at, status, payment_payer)
             VALUES (?1, ?2, ?3, ?4, ?5, 'analyzing', ?6)",
            params![
                new.run_id,
                new.user_id,
                new.user_url,
                new.target_keyword,
                fmt_ts(&created_at),
                new.payment_payer,
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists {
                run_id: new.run_id.clone(),
            });
        }

        Ok(ReportRecord {
            run_id: new.run_id.clone(),
            user_id: new.user_id.clone(),
            user_url: new.user_url.clone(),
            target_keyword: new.target_keyword.clone(),
            created_at: parse_ts(&fmt_ts(&created_at)).unwrap_or(created_at),
            status: RunStatus::Analyzing,
            user_site_data: None,
            discovered_keywords: None,
            google_ranking: None,
            competitor_data: None,
            patterns: None,
            gaps: None,
            recommendations: None,
            score: None,
            report_data: None,
            failure_reason: None,
            payment_payer: new.payment_payer.clone(),
            payment_tx_hash: None,
        })
    }

    pub fn get(&self, run_id: &str) -> Result<Option<ReportRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::get_inner(&conn, run_id)
    }

    fn get_inner(conn: &Connection, run_id: &str) -> Result<Option<ReportRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM reports WHERE run_id = ?1");
        let raw = conn.query_row(&sql, [run_id], RawRecord::from_row).optional()?;
        raw.map(RawRecord::decode).transpose()
    }

    /// Write one stage output. Refused once the run is terminal.
    pub fn checkpoint(&self, run_id: &str, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let field = checkpoint.field();
        let json = checkpoint
            .to_json()
            .map_err(|e| StoreError::InvalidValue {
                field: field.json_name().to_string(),
                message: e.to_string(),
            })?;

        let conn = self.conn.lock().unwrap();
        // Column names come from a closed enum, never from input.
        let sql = format!(
            "UPDATE reports SET {} = ?1 WHERE run_id = ?2 AND status = 'analyzing'",
            field.column()
        );
        let n = conn.execute(&sql, params![json, run_id])?;
        if n == 0 {
            return Err(Self::write_refused(&conn, run_id)?);
        }
        Ok(())
    }

    /// `analyzing -> completed`.
    pub fn complete(&self, run_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE reports SET status = 'completed', finished_at = ?1
             WHERE run_id = ?2 AND status = 'analyzing'",
            params![fmt_ts(&Utc::now()), run_id],
        )?;
        if n == 0 {
            return Err(Self::write_refused(&conn, run_id)?);
        }
        Ok(())
    }

    /// `analyzing -> failed`, recording a user-safe reason.
    pub fn fail(&self, run_id: &str, reason: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE reports SET status = 'failed', finished_at = ?1, failure_reason = ?2
             WHERE run_id = ?3 AND status = 'analyzing'",
            params![fmt_ts(&Utc::now()), reason, run_id],
        )?;
        if n == 0 {
            return Err(Self::write_refused(&conn, run_id)?);
        }
        Ok(())
    }

    fn write_refused(conn: &Connection, run_id: &str) -> Result<StoreError, StoreError> {
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM reports WHERE run_id = ?1",
                [run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(match status {
            None => StoreError::NotFound {
                run_id: run_id.to_string(),
            },
            Some(s) => StoreError::NotAnalyzing {
                run_id: run_id.to_string(),
                status: decode_status(run_id, &s)?,
            },
        })
    }

    /// Settlement may land after the run finished, so status is not checked.
    pub fn record_payment_settlement(&self, run_id: &str, tx_hash: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE reports SET payment_tx_hash = ?1 WHERE run_id = ?2",
            params![tx_hash, run_id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(())
    }

    /// A user's runs, newest first.
    pub fn list_by_user(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<UserReportPage, StoreError> {
        let conn = self.conn.lock().unwrap();
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT run_id, user_url, target_keyword, status, created_at, google_ranking
             FROM reports WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![user_id, limit, offset], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut reports = Vec::new();
        for row in rows {
            let (run_id, url, target_keyword, status, created_at, ranking) = row?;
            let ranking: Option<crate::model::RankingResult> =
                decode_json(&run_id, "googleRanking", ranking)?;
            reports.push(ReportSummary {
                status: decode_status(&run_id, &status)?,
                created_at: decode_ts(&run_id, &created_at)?,
                google_ranking: ranking.and_then(|r| r.rank),
                run_id,
                url,
                target_keyword,
            });
        }

        Ok(UserReportPage {
            reports,
            total: total.max(0) as u64,
        })
    }

    /// Most recently created runs, any user.
    pub fn list_recent(&self, n: u32) -> Result<Vec<ReportRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM reports ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
            .query_map([n], RawRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawRecord::decode).collect()
    }

    /// Run ids still `analyzing`, oldest first.
    pub fn list_in_progress(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT run_id FROM reports WHERE status = 'analyzing' ORDER BY created_at ASC, rowid ASC",
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Merge payload fields into a terminal run.
    ///
    /// Keys use the JSON field names (`gaps`, `reportData`, ...). Every value
    /// must decode as that field's type; the whole patch is applied or none.
    pub fn merge_patch(
        &self,
        run_id: &str,
        patch: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ReportRecord, StoreError> {
        let mut updates = Vec::with_capacity(patch.len());
        for (key, value) in patch {
            let field = RecordField::from_json_name(key)
                .ok_or_else(|| StoreError::UnknownField(key.clone()))?;
            let cp = Checkpoint::from_value(field, value.clone()).map_err(|e| {
                StoreError::InvalidValue {
                    field: key.clone(),
                    message: e.to_string(),
                }
            })?;
            let json = cp.to_json().map_err(|e| StoreError::InvalidValue {
                field: key.clone(),
                message: e.to_string(),
            })?;
            updates.push((field, json));
        }

        let conn = self.conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result = Self::merge_patch_inner(&conn, run_id, &updates);

        match &result {
            Ok(_) => {
                conn.execute("COMMIT", [])?;
            }
            Err(_) => {
                let _ = conn.execute("ROLLBACK", []);
            }
        }

        result
    }

    fn merge_patch_inner(
        conn: &Connection,
        run_id: &str,
        updates: &[(RecordField, String)],
    ) -> Result<ReportRecord, StoreError> {
        let status: String = conn
            .query_row(
                "SELECT status FROM reports WHERE run_id = ?1",
                [run_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                run_id: run_id.to_string(),
            })?;
        if !decode_status(run_id, &status)?.is_terminal() {
            return Err(StoreError::StillAnalyzing {
                run_id: run_id.to_string(),
            });
        }

        for (field, json) in updates {
            let sql = format!("UPDATE reports SET {} = ?1 WHERE run_id = ?2", field.column());
            conn.execute(&sql, params![json, run_id])?;
        }

        Self::get_inner(conn, run_id)?.ok_or_else(|| StoreError::NotFound {
            run_id: run_id.to_string(),
        })
    }

    /// Delete every run. Operator use only.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute("DELETE FROM reports", [])?)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }
}

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn decode_ts(run_id: &str, s: &str) -> Result<DateTime<Utc>, StoreError> {
    parse_ts(s).ok_or_else(|| StoreError::Corrupt {
        run_id: run_id.to_string(),
        message: format!("bad timestamp {s:?}"),
    })
}

fn decode_status(run_id: &str, s: &str) -> Result<RunStatus, StoreError> {
    RunStatus::parse(s).ok_or_else(|| StoreError::Corrupt {
        run_id: run_id.to_string(),
        message: format!("bad status {s:?}"),
    })
}

fn decode_json<T: DeserializeOwned>(
    run_id: &str,
    field: &str,
    raw: Option<String>,
) -> Result<Option<T>, StoreError> {
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| StoreError::Corrupt {
            run_id: run_id.to_string(),
            message: format!("{field}: {e}"),
        })
    })
    .transpose()
}

/// Column values as read, before JSON decoding (which needs `run_id` for
/// error context and must happen outside the rusqlite row closure).
struct RawRecord {
    run_id: String,
    user_id: String,
    user_url: String,
    target_keyword: String,
    created_at: String,
    status: String,
    failure_reason: Option<String>,
    payment_payer: Option<String>,
    payment_tx_hash: Option<String>,
    payload: [Option<String>; 9],
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            user_id: row.get(1)?,
            user_url: row.get(2)?,
            target_keyword: row.get(3)?,
            created_at: row.get(4)?,
            status: row.get(5)?,
            failure_reason: row.get(6)?,
            payment_payer: row.get(7)?,
            payment_tx_hash: row.get(8)?,
            payload: [
                row.get(9)?,
                row.get(10)?,
                row.get(11)?,
                row.get(12)?,
                row.get(13)?,
                row.get(14)?,
                row.get(15)?,
                row.get(16)?,
                row.get(17)?,
            ],
        })
    }

    fn decode(self) -> Result<ReportRecord, StoreError> {
        let id = self.run_id.as_str();
        let [site, keywords, ranking, competitors, patterns, gaps, recs, score, report] =
            self.payload;
        Ok(ReportRecord {
            created_at: decode_ts(id, &self.created_at)?,
            status: decode_status(id, &self.status)?,
            user_site_data: decode_json(id, "userSiteData", site)?,
            discovered_keywords: decode_json(id, "discoveredKeywords", keywords)?,
            google_ranking: decode_json(id, "googleRanking", ranking)?,
            competitor_data: decode_json(id, "competitorData", competitors)?,
            patterns: decode_json(id, "patterns", patterns)?,
            gaps: decode_json(id, "gaps", gaps)?,
            recommendations: decode_json(id, "recommendations", recs)?,
            score: decode_json(id, "score", score)?,
            report_data: decode_json(id, "reportData", report)?,
            failure_reason: self.failure_reason,
            payment_payer: self.payment_payer,
            payment_tx_hash: self.payment_tx_hash,
            user_id: self.user_id,
            user_url: self.user_url,
            target_keyword: self.target_keyword,
            run_id: self.run_id,
        })
    }
}
