use std::path::{Path, PathBuf};
use std::time::Duration;

use scand::config::{ScanningConfig, ToolPaths};
use scand::core::{ScanEngine, ScanKind, ScanParams, ScanStatus};
use scand::db;
use scand::error::ScanError;
use tokio::time::timeout;

fn missing_tools() -> ToolPaths {
    ToolPaths {
        nmap: PathBuf::from("/nonexistent/nmap"),
        nikto: PathBuf::from("/nonexistent/nikto"),
        gobuster: PathBuf::from("/nonexistent/gobuster"),
        sqlmap: PathBuf::from("/nonexistent/sqlmap"),
        wpscan: PathBuf::from("/nonexistent/wpscan"),
    }
}

fn fast_scanning() -> ScanningConfig {
    ScanningConfig {
        mock_delay_ms: 10,
        ..Default::default()
    }
}

async fn engine_with(
    scanning: ScanningConfig,
    tools: ToolPaths,
) -> (ScanEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scand.db");
    let conn = db::init(path.to_str().unwrap()).await.unwrap();
    (ScanEngine::new(conn, &scanning, &tools), dir)
}

async fn wait_for_terminal(engine: &ScanEngine, job_id: &str, owner_id: &str) -> scand::core::ScanJob {
    timeout(Duration::from_secs(5), async {
        loop {
            let job = engine.get(job_id, owner_id).await.expect("job must exist");
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("timeout waiting for the job to finish")
}

/// Writes an executable stand-in for a scanning tool.
fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn port_scan_without_nmap_completes_with_mock_output() {
    let (engine, _dir) = engine_with(fast_scanning(), missing_tools()).await;

    let params = ScanParams {
        ports: Some("1-1000".to_string()),
        ..Default::default()
    };
    let job = engine
        .submit("alice", ScanKind::PortScan, "example.com", params)
        .await
        .unwrap();

    // the response is immediate: a tracked record already in flight
    assert_eq!(job.status, ScanStatus::Running);
    assert!(job.result.is_none());
    assert!(job.error_message.is_none());
    assert!(job.completed_at.is_none());

    let done = wait_for_terminal(&engine, &job.id, "alice").await;
    assert_eq!(done.status, ScanStatus::Completed);
    assert!(done.completed_at.is_some());
    assert!(done.error_message.is_none());

    let result = done.result.expect("completed job carries a result");
    let output = result["output"].as_str().unwrap();
    assert!(output.contains("example.com"));
    assert!(output.contains("1-1000"));
}

#[tokio::test]
async fn every_scan_kind_completes_against_a_bare_host() {
    let (engine, _dir) = engine_with(fast_scanning(), missing_tools()).await;

    for kind in ScanKind::ALL {
        let job = engine
            .submit("alice", kind, "https://example.com", ScanParams::default())
            .await
            .unwrap();
        let done = wait_for_terminal(&engine, &job.id, "alice").await;
        assert_eq!(
            done.status,
            ScanStatus::Completed,
            "{} must fall back to mock output",
            kind.as_str()
        );
        assert!(done.result.is_some());
    }
}

#[tokio::test]
async fn empty_target_is_rejected_before_any_record_exists() {
    let (engine, _dir) = engine_with(fast_scanning(), missing_tools()).await;

    let err = engine
        .submit("alice", ScanKind::PortScan, "   ", ScanParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Validation(_)));

    assert!(engine.list("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn a_foreign_owner_cannot_see_the_job() {
    let (engine, _dir) = engine_with(fast_scanning(), missing_tools()).await;

    let job = engine
        .submit("alice", ScanKind::PortScan, "example.com", ScanParams::default())
        .await
        .unwrap();

    let err = engine.get(&job.id, "mallory").await.unwrap_err();
    assert!(matches!(err, ScanError::NotFound));
}

#[tokio::test]
async fn listing_is_newest_first() {
    let (engine, _dir) = engine_with(fast_scanning(), missing_tools()).await;

    let first = engine
        .submit("alice", ScanKind::PortScan, "one.example.com", ScanParams::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = engine
        .submit("alice", ScanKind::WebProbe, "two.example.com", ScanParams::default())
        .await
        .unwrap();

    let jobs = engine.list("alice").await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, second.id);
    assert_eq!(jobs[1].id, first.id);
}

#[tokio::test]
async fn a_failing_tool_marks_the_job_failed() {
    let mut tools = missing_tools();
    tools.nmap = PathBuf::from("/bin/false");
    let (engine, _dir) = engine_with(fast_scanning(), tools).await;

    let job = engine
        .submit("alice", ScanKind::PortScan, "example.com", ScanParams::default())
        .await
        .unwrap();

    let done = wait_for_terminal(&engine, &job.id, "alice").await;
    assert_eq!(done.status, ScanStatus::Failed);
    assert!(done.result.is_none());
    assert!(done.completed_at.is_some());
    let message = done.error_message.expect("failed job carries an error");
    assert!(message.contains("exit code 1"));
}

#[tokio::test]
async fn wpscan_findings_exit_code_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let mut tools = missing_tools();
    tools.wpscan = fake_tool(
        dir.path(),
        "wpscan",
        "#!/bin/sh\necho '[+] 3 vulnerabilities identified'\nexit 2\n",
    );
    let (engine, _db_dir) = engine_with(fast_scanning(), tools).await;

    let job = engine
        .submit("alice", ScanKind::CmsScan, "https://blog.example.com", ScanParams::default())
        .await
        .unwrap();

    let done = wait_for_terminal(&engine, &job.id, "alice").await;
    assert_eq!(done.status, ScanStatus::Completed);
    let result = done.result.expect("findings are a result, not an error");
    assert!(
        result["output"]
            .as_str()
            .unwrap()
            .contains("3 vulnerabilities identified")
    );
}

#[tokio::test]
async fn wpscan_error_exit_code_still_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut tools = missing_tools();
    tools.wpscan = fake_tool(dir.path(), "wpscan", "#!/bin/sh\necho 'bad url'\nexit 1\n");
    let (engine, _db_dir) = engine_with(fast_scanning(), tools).await;

    let job = engine
        .submit("alice", ScanKind::CmsScan, "https://blog.example.com", ScanParams::default())
        .await
        .unwrap();

    let done = wait_for_terminal(&engine, &job.id, "alice").await;
    assert_eq!(done.status, ScanStatus::Failed);
}

#[tokio::test]
async fn a_slow_tool_is_cut_off_at_the_configured_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let mut tools = missing_tools();
    tools.nmap = fake_tool(dir.path(), "nmap", "#!/bin/sh\nsleep 30\n");
    let scanning = ScanningConfig {
        tool_timeout_secs: Some(1),
        ..fast_scanning()
    };
    let (engine, _db_dir) = engine_with(scanning, tools).await;

    let job = engine
        .submit("alice", ScanKind::PortScan, "example.com", ScanParams::default())
        .await
        .unwrap();

    let done = wait_for_terminal(&engine, &job.id, "alice").await;
    assert_eq!(done.status, ScanStatus::Failed);
    assert!(done.error_message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn a_concurrency_cap_queues_rather_than_drops() {
    let scanning = ScanningConfig {
        max_concurrent: Some(1),
        ..fast_scanning()
    };
    let (engine, _dir) = engine_with(scanning, missing_tools()).await;

    let mut ids = Vec::new();
    for host in ["a.example.com", "b.example.com", "c.example.com"] {
        let job = engine
            .submit("alice", ScanKind::PortScan, host, ScanParams::default())
            .await
            .unwrap();
        ids.push(job.id);
    }

    for id in &ids {
        let done = wait_for_terminal(&engine, id, "alice").await;
        assert_eq!(done.status, ScanStatus::Completed);
    }
}
