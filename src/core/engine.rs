//! Asynchronous scan job engine.
//!
//! `submit` persists a record in `running` state and returns it
//! immediately; a detached worker drives the external tool and writes
//! the terminal outcome back exactly once. The caller never waits for
//! the tool and never receives its failure directly: outcomes are
//! observed by polling `get`/`list`.
//!
//! Workers run on a [`TaskTracker`] so the detached set is a
//! first-class, drainable object. There is no cap on it unless one is
//! configured: the admission gate bounds the submission rate, not the
//! number of scans in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_rusqlite::Connection;
use tokio_util::task::TaskTracker;

use crate::config::{ScanningConfig, ToolPaths};
use crate::db::scans;
use crate::error::ScanError;
use crate::invokers;

use super::invoker::{InvokeError, ToolInvoker};
use super::models::{ScanJob, ScanKind, ScanParams};

pub struct ScanEngine {
    conn: Connection,
    invokers: HashMap<ScanKind, Arc<dyn ToolInvoker>>,
    workers: TaskTracker,
    permits: Option<Arc<Semaphore>>,
    tool_timeout: Option<Duration>,
}

impl ScanEngine {
    pub fn new(conn: Connection, scanning: &ScanningConfig, tools: &ToolPaths) -> Self {
        Self {
            conn,
            invokers: invokers::build(scanning, tools),
            workers: TaskTracker::new(),
            permits: scanning
                .max_concurrent
                .map(|cap| Arc::new(Semaphore::new(cap))),
            tool_timeout: scanning.tool_timeout(),
        }
    }

    /// Accept a scan request. The record is persisted before this
    /// returns, so the caller can always query what it was handed.
    pub async fn submit(
        &self,
        owner_id: &str,
        kind: ScanKind,
        target: &str,
        parameters: ScanParams,
    ) -> Result<ScanJob, ScanError> {
        if target.trim().is_empty() {
            return Err(ScanError::Validation("target must not be empty".to_string()));
        }
        let Some(invoker) = self.invokers.get(&kind) else {
            return Err(ScanError::Validation(format!(
                "no invoker for scan kind {}",
                kind.as_str()
            )));
        };

        let job = ScanJob::new(owner_id, kind, target, parameters);
        scans::create(&self.conn, &job).await.map_err(ScanError::Store)?;
        tracing::info!(
            job_id = %job.id,
            kind = kind.as_str(),
            target = %job.target,
            "scan accepted"
        );

        self.spawn_worker(job.clone(), Arc::clone(invoker));
        Ok(job)
    }

    pub async fn get(&self, job_id: &str, owner_id: &str) -> Result<ScanJob, ScanError> {
        scans::get(&self.conn, job_id.to_string(), owner_id.to_string())
            .await
            .map_err(ScanError::Store)?
            .ok_or(ScanError::NotFound)
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<ScanJob>, ScanError> {
        scans::list(&self.conn, owner_id.to_string())
            .await
            .map_err(ScanError::Store)
    }

    /// Stop accepting completions and wait for in-flight workers.
    pub async fn drain(&self) {
        self.workers.close();
        self.workers.wait().await;
    }

    fn spawn_worker(&self, job: ScanJob, invoker: Arc<dyn ToolInvoker>) {
        let conn = self.conn.clone();
        let permits = self.permits.clone();
        let tool_timeout = self.tool_timeout;

        self.workers.spawn(async move {
            let _permit = match permits {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            let outcome = run_with_deadline(invoker.as_ref(), &job, tool_timeout).await;
            finalize(&conn, &job, outcome).await;
        });
    }
}

async fn run_with_deadline(
    invoker: &dyn ToolInvoker,
    job: &ScanJob,
    deadline: Option<Duration>,
) -> Result<Value, InvokeError> {
    let run = invoker.run(&job.target, &job.parameters);
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(InvokeError::TimedOut {
                tool: job.kind.tool_name(),
                after_secs: limit.as_secs(),
            }),
        },
        None => run.await,
    }
}

async fn finalize(conn: &Connection, job: &ScanJob, outcome: Result<Value, InvokeError>) {
    let written = match outcome {
        Ok(result) => {
            tracing::info!(job_id = %job.id, "scan completed");
            scans::complete(conn, job.id.clone(), result).await
        }
        Err(err) => {
            tracing::warn!(job_id = %job.id, error = %err, "scan failed");
            scans::fail(conn, job.id.clone(), err.to_string()).await
        }
    };

    match written {
        Ok(true) => {}
        Ok(false) => tracing::warn!(job_id = %job.id, "job already terminal, outcome dropped"),
        Err(err) => {
            tracing::error!(job_id = %job.id, error = %err, "failed to persist scan outcome");
        }
    }
}
