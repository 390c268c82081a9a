use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::models::{ScanKind, ScanParams};

/// Failure of one tool run. Recorded on the job as its error message;
/// never returned to the submitting caller.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("{tool} execution failed with {}: {output}", exit_label(*.code))]
    ToolFailed {
        tool: &'static str,
        code: Option<i32>,
        output: String,
    },

    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {after_secs}s")]
    TimedOut { tool: &'static str, after_secs: u64 },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// Runs one kind of scan against a target and normalizes the outcome.
///
/// Invokers are pure from the engine's point of view: no shared state
/// besides the returned payload. A missing binary is not an error; the
/// invoker produces a labeled mock payload instead so the job lifecycle
/// works on hosts without the tool installed.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    fn kind(&self) -> ScanKind;

    async fn run(&self, target: &str, params: &ScanParams) -> Result<Value, InvokeError>;
}
