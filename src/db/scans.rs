//! Persistence for scan job records.
//!
//! A record is inserted once at submission, finalized at most once by
//! the worker that owns it, and read concurrently by query callers. The
//! finalize statements are guarded on a non-terminal status so a late
//! or duplicate outcome can never overwrite a terminal record. Every
//! read maps one full row, so callers always see a consistent snapshot
//! of status and terminal fields.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio_rusqlite::{Connection, params, rusqlite};
use tokio_rusqlite::rusqlite::OptionalExtension;

use crate::core::models::{ScanJob, ScanKind, ScanStatus};

const JOB_COLUMNS: &str = "id, owner_id, kind, target, parameters, status, \
                           result, error_message, started_at, completed_at";

pub async fn create(conn: &Connection, job: &ScanJob) -> Result<()> {
    let job = job.clone();
    let parameters = serde_json::to_string(&job.parameters)?;

    conn.call(move |c| {
        c.execute(
            "INSERT INTO scans (id, owner_id, kind, target, parameters, status, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.id,
                job.owner_id,
                job.kind.as_str(),
                job.target,
                parameters,
                job.status.as_str(),
                encode_timestamp(job.started_at),
            ],
        )?;
        Ok::<(), rusqlite::Error>(())
    })
    .await?;

    Ok(())
}

/// Mark the job completed and attach its result. Returns false when the
/// job was already terminal and nothing was written.
pub async fn complete(conn: &Connection, job_id: String, result: Value) -> Result<bool> {
    let changed = conn
        .call(move |c| {
            c.execute(
                "UPDATE scans
                 SET status = 'completed', result = ?2, completed_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'running')",
                params![job_id, result.to_string(), encode_timestamp(Utc::now())],
            )
        })
        .await?;

    Ok(changed == 1)
}

/// Mark the job failed and record why. Returns false when the job was
/// already terminal and nothing was written.
pub async fn fail(conn: &Connection, job_id: String, error_message: String) -> Result<bool> {
    let changed = conn
        .call(move |c| {
            c.execute(
                "UPDATE scans
                 SET status = 'failed', error_message = ?2, completed_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'running')",
                params![job_id, error_message, encode_timestamp(Utc::now())],
            )
        })
        .await?;

    Ok(changed == 1)
}

/// Fetch one job, scoped to its owner. A foreign owner's job id comes
/// back as `None`, indistinguishable from an id that never existed.
pub async fn get(conn: &Connection, job_id: String, owner_id: String) -> Result<Option<ScanJob>> {
    let job = conn
        .call(move |c| {
            let mut stmt = c.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM scans WHERE id = ?1 AND owner_id = ?2"
            ))?;
            stmt.query_row(params![job_id, owner_id], job_from_row)
                .optional()
        })
        .await?;

    Ok(job)
}

/// All of one owner's jobs, newest first.
pub async fn list(conn: &Connection, owner_id: String) -> Result<Vec<ScanJob>> {
    let jobs = conn
        .call(move |c| {
            let mut stmt = c.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM scans
                 WHERE owner_id = ?1
                 ORDER BY started_at DESC, id DESC"
            ))?;
            let jobs = stmt
                .query_map(params![owner_id], job_from_row)?
                .collect::<Result<Vec<_>, rusqlite::Error>>()?;
            Ok::<_, rusqlite::Error>(jobs)
        })
        .await?;

    Ok(jobs)
}

// Timestamps are stored as fixed-width RFC 3339 so the newest-first
// index order matches chronological order.
fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanJob> {
    let kind: String = row.get(2)?;
    let parameters: String = row.get(4)?;
    let status: String = row.get(5)?;
    let result: Option<String> = row.get(6)?;
    let started_at: String = row.get(8)?;
    let completed_at: Option<String> = row.get(9)?;

    Ok(ScanJob {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: ScanKind::from_str(&kind)
            .ok_or_else(|| bad_column(2, format!("unknown scan kind: {kind}")))?,
        target: row.get(3)?,
        parameters: serde_json::from_str(&parameters)
            .map_err(|err| bad_column(4, err.to_string()))?,
        status: ScanStatus::from_str(&status)
            .ok_or_else(|| bad_column(5, format!("unknown scan status: {status}")))?,
        result: result
            .map(|raw| serde_json::from_str(&raw).map_err(|err| bad_column(6, err.to_string())))
            .transpose()?,
        error_message: row.get(7)?,
        started_at: decode_timestamp(8, &started_at)?,
        completed_at: completed_at
            .map(|raw| decode_timestamp(9, &raw))
            .transpose()?,
    })
}

fn decode_timestamp(index: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| bad_column(index, err.to_string()))
}

fn bad_column(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, message.into())
}
