//! SQLite-backed store.
//!
//! Timestamps are stored as RFC 3339 text, prediction vectors and plagiarism
//! matches as JSON. Claims are conditional updates, so two processes sharing
//! the same database file never dispatch the same team twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::{Result, StorageError, SubmissionStore};
use crate::types::{
    EvaluationResult, LeaderboardInput, PlagiarismMatch, PlagiarismRecord, QueueEntry,
    QueueStatus, Team,
};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Database(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StorageError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )
        .map_err(|e| StorageError::Database(format!("Failed to set pragmas: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables()?;

        info!("Opened SQLite store at {:?}", path);
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Database(format!("Failed to open in-memory db: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS teams (
                    team_id TEXT PRIMARY KEY,
                    team_name TEXT NOT NULL,
                    endpoint_url TEXT NOT NULL,
                    owner_id TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS queue (
                    team_id TEXT PRIMARY KEY,
                    status TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    queued_at TEXT NOT NULL,
                    failure_reason TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_queue_status ON queue(status, position);
                CREATE TABLE IF NOT EXISTS results (
                    team_id TEXT PRIMARY KEY,
                    accuracy REAL NOT NULL,
                    f1_score REAL NOT NULL,
                    latency_ms REAL NOT NULL,
                    evaluated_at TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS predictions (
                    team_id TEXT PRIMARY KEY,
                    labels TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS plagiarism (
                    team_id TEXT PRIMARY KEY,
                    is_flagged INTEGER NOT NULL,
                    matches TEXT NOT NULL,
                    checked_at TEXT NOT NULL
                );",
            )
            .map_err(|e| StorageError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData(format!("bad timestamp {:?}: {}", raw, e)))
}

fn parse_status(raw: &str) -> Result<QueueStatus> {
    QueueStatus::parse(raw)
        .ok_or_else(|| StorageError::InvalidData(format!("unknown queue status {:?}", raw)))
}

/// Conditional QUEUED -> EVALUATING on an open connection or transaction.
fn claim(conn: &Connection, team_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE queue SET status = ?1, failure_reason = NULL
         WHERE team_id = ?2 AND status = ?3",
        params![
            QueueStatus::Evaluating.as_str(),
            team_id,
            QueueStatus::Queued.as_str()
        ],
    )?;
    Ok(changed == 1)
}

fn plagiarism_record(
    team_id: String,
    is_flagged: bool,
    matches: &str,
    checked_at: &str,
) -> Result<PlagiarismRecord> {
    let matches: Vec<PlagiarismMatch> = serde_json::from_str(matches)?;
    Ok(PlagiarismRecord {
        team_id,
        is_flagged,
        matches,
        checked_at: parse_time(checked_at)?,
    })
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    // ==================== Teams ====================

    async fn upsert_team(&self, team: &Team) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO teams (team_id, team_name, endpoint_url, owner_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(team_id) DO UPDATE SET
                team_name = excluded.team_name,
                endpoint_url = excluded.endpoint_url,
                owner_id = excluded.owner_id",
            params![
                team.team_id,
                team.team_name,
                team.endpoint_url,
                team.owner_id,
                team.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT team_id, team_name, endpoint_url, owner_id, created_at
                 FROM teams WHERE team_id = ?1",
                params![team_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(team_id, team_name, endpoint_url, owner_id, created_at)| {
            Ok(Team {
                team_id,
                team_name,
                endpoint_url,
                owner_id,
                created_at: parse_time(&created_at)?,
            })
        })
        .transpose()
    }

    // ==================== Queue ====================

    async fn enqueue(&self, team_id: &str) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let max_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), 0) FROM queue WHERE status = ?1 AND team_id != ?2",
            params![QueueStatus::Queued.as_str(), team_id],
            |row| row.get(0),
        )?;
        let position = max_position + 1;

        tx.execute(
            "INSERT INTO queue (team_id, status, position, queued_at, failure_reason)
             VALUES (?1, ?2, ?3, ?4, NULL)
             ON CONFLICT(team_id) DO UPDATE SET
                status = excluded.status,
                position = excluded.position,
                queued_at = excluded.queued_at,
                failure_reason = NULL",
            params![
                team_id,
                QueueStatus::Queued.as_str(),
                position,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        Ok(position)
    }

    async fn get_queue_entry(&self, team_id: &str) -> Result<Option<QueueEntry>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT team_id, status, position, queued_at, failure_reason
                 FROM queue WHERE team_id = ?1",
                params![team_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(team_id, status, position, queued_at, failure_reason)| {
            Ok(QueueEntry {
                team_id,
                status: parse_status(&status)?,
                position,
                queued_at: parse_time(&queued_at)?,
                failure_reason,
            })
        })
        .transpose()
    }

    async fn get_next_serial(&self) -> Result<Option<String>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let in_flight: i64 = tx.query_row(
            "SELECT COUNT(*) FROM queue WHERE status = ?1",
            params![QueueStatus::Evaluating.as_str()],
            |row| row.get(0),
        )?;
        if in_flight > 0 {
            return Ok(None);
        }

        let next: Option<String> = tx
            .query_row(
                "SELECT team_id FROM queue WHERE status = ?1
                 ORDER BY position ASC, team_id ASC LIMIT 1",
                params![QueueStatus::Queued.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let claimed = match next {
            Some(team_id) if claim(&tx, &team_id)? => Some(team_id),
            _ => None,
        };
        tx.commit()?;
        Ok(claimed)
    }

    async fn get_next_queued(&self, limit: usize) -> Result<Vec<String>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidates: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT team_id FROM queue WHERE status = ?1
                 ORDER BY position ASC, team_id ASC LIMIT ?2",
            )?;
            let rows = stmt.query_map(
                params![QueueStatus::Queued.as_str(), limit as i64],
                |row| row.get(0),
            )?;
            rows.collect::<std::result::Result<_, _>>()?
        };

        let mut claimed = Vec::with_capacity(candidates.len());
        for team_id in candidates {
            if claim(&tx, &team_id)? {
                claimed.push(team_id);
            }
        }
        tx.commit()?;
        Ok(claimed)
    }

    async fn try_claim(&self, team_id: &str) -> Result<bool> {
        claim(&self.conn.lock(), team_id)
    }

    async fn set_queue_status(
        &self,
        team_id: &str,
        status: QueueStatus,
        failure_reason: Option<&str>,
    ) -> Result<()> {
        let changed = self.conn.lock().execute(
            "UPDATE queue SET status = ?1, failure_reason = ?2 WHERE team_id = ?3",
            params![status.as_str(), failure_reason, team_id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("queue entry {}", team_id)));
        }
        Ok(())
    }

    async fn count_by_status(&self, status: QueueStatus) -> Result<usize> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM queue WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ==================== Results ====================

    async fn save_result(&self, result: &EvaluationResult) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO results (team_id, accuracy, f1_score, latency_ms, evaluated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.team_id,
                result.accuracy,
                result.f1_score,
                result.latency_ms,
                result.evaluated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn get_result(&self, team_id: &str) -> Result<Option<EvaluationResult>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT team_id, accuracy, f1_score, latency_ms, evaluated_at
                 FROM results WHERE team_id = ?1",
                params![team_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(team_id, accuracy, f1_score, latency_ms, evaluated_at)| {
            Ok(EvaluationResult {
                team_id,
                accuracy,
                f1_score,
                latency_ms,
                evaluated_at: parse_time(&evaluated_at)?,
            })
        })
        .transpose()
    }

    async fn save_predictions(&self, team_id: &str, predictions: &[i64]) -> Result<()> {
        let labels = serde_json::to_string(predictions)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO predictions (team_id, labels) VALUES (?1, ?2)",
            params![team_id, labels],
        )?;
        Ok(())
    }

    async fn get_predictions(&self, team_id: &str) -> Result<Option<Vec<i64>>> {
        let labels: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT labels FROM predictions WHERE team_id = ?1",
                params![team_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(labels
            .map(|labels| serde_json::from_str(&labels))
            .transpose()?)
    }

    async fn delete_predictions(&self, team_id: &str) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM predictions WHERE team_id = ?1", params![team_id])?;
        Ok(())
    }

    async fn get_all_predictions(&self) -> Result<HashMap<String, Vec<i64>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT team_id, labels FROM predictions")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut all = HashMap::new();
        for row in rows {
            let (team_id, labels) = row?;
            all.insert(team_id, serde_json::from_str(&labels)?);
        }
        Ok(all)
    }

    async fn commit_evaluation(
        &self,
        result: &EvaluationResult,
        record: &PlagiarismRecord,
    ) -> Result<()> {
        let matches = serde_json::to_string(&record.matches)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE queue SET status = ?1, failure_reason = NULL WHERE team_id = ?2",
            params![QueueStatus::Completed.as_str(), result.team_id],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls it back
            return Err(StorageError::NotFound(format!(
                "queue entry {}",
                result.team_id
            )));
        }

        tx.execute(
            "INSERT OR REPLACE INTO results (team_id, accuracy, f1_score, latency_ms, evaluated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.team_id,
                result.accuracy,
                result.f1_score,
                result.latency_ms,
                result.evaluated_at.to_rfc3339()
            ],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO plagiarism (team_id, is_flagged, matches, checked_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.team_id,
                record.is_flagged,
                matches,
                record.checked_at.to_rfc3339()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ==================== Plagiarism ====================

    async fn save_plagiarism(&self, record: &PlagiarismRecord) -> Result<()> {
        let matches = serde_json::to_string(&record.matches)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO plagiarism (team_id, is_flagged, matches, checked_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.team_id,
                record.is_flagged,
                matches,
                record.checked_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn get_plagiarism(&self, team_id: &str) -> Result<Option<PlagiarismRecord>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT team_id, is_flagged, matches, checked_at
                 FROM plagiarism WHERE team_id = ?1",
                params![team_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(team_id, is_flagged, matches, checked_at)| {
            plagiarism_record(team_id, is_flagged, &matches, &checked_at)
        })
        .transpose()
    }

    async fn list_plagiarism(&self) -> Result<Vec<PlagiarismRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT team_id, is_flagged, matches, checked_at FROM plagiarism ORDER BY team_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (team_id, is_flagged, matches, checked_at) = row?;
            records.push(plagiarism_record(
                team_id,
                is_flagged,
                &matches,
                &checked_at,
            )?);
        }
        Ok(records)
    }

    // ==================== Leaderboard ====================

    async fn get_leaderboard_inputs(&self) -> Result<Vec<LeaderboardInput>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT r.team_id, r.accuracy, r.f1_score, r.latency_ms, r.evaluated_at,
                    t.team_name, p.is_flagged, p.matches, p.checked_at
             FROM results r
             JOIN teams t ON t.team_id = r.team_id
             LEFT JOIN plagiarism p ON p.team_id = r.team_id
             ORDER BY r.team_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                (
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                ),
                row.get::<_, String>(5)?,
                (
                    row.get::<_, Option<bool>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                ),
            ))
        })?;

        let mut inputs = Vec::new();
        for row in rows {
            let ((team_id, accuracy, f1_score, latency_ms, evaluated_at), team_name, plagiarism) =
                row?;

            let plagiarism = match plagiarism {
                (Some(is_flagged), Some(matches), Some(checked_at)) => Some(plagiarism_record(
                    team_id.clone(),
                    is_flagged,
                    &matches,
                    &checked_at,
                )?),
                _ => None,
            };

            inputs.push(LeaderboardInput {
                result: EvaluationResult {
                    team_id,
                    accuracy,
                    f1_score,
                    latency_ms,
                    evaluated_at: parse_time(&evaluated_at)?,
                },
                team_name,
                plagiarism,
            });
        }
        Ok(inputs)
    }
}
