//! One invoker per scanning tool.
//!
//! Every invoker follows the same policy: if the configured binary is
//! missing from this host, sleep the configured mock delay and return a
//! deterministic `[MOCK]`-labeled payload so the job lifecycle still
//! works end to end. If the binary exists, run it with that tool's
//! argument syntax, capture stdout and stderr together, and classify
//! the exit status. Most tools treat any non-zero exit as failure;
//! wpscan is the exception and keeps its own mapping.

mod gobuster;
mod nikto;
mod nmap;
mod sqlmap;
mod wpscan;

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

use crate::config::{ScanningConfig, ToolPaths};
use crate::core::invoker::{InvokeError, ToolInvoker};
use crate::core::models::ScanKind;

pub use gobuster::GobusterInvoker;
pub use nikto::NiktoInvoker;
pub use nmap::NmapInvoker;
pub use sqlmap::SqlmapInvoker;
pub use wpscan::WpscanInvoker;

/// Build the full invoker set from configuration.
pub fn build(
    scanning: &ScanningConfig,
    tools: &ToolPaths,
) -> HashMap<ScanKind, Arc<dyn ToolInvoker>> {
    let mut invokers: HashMap<ScanKind, Arc<dyn ToolInvoker>> = HashMap::new();
    invokers.insert(
        ScanKind::PortScan,
        Arc::new(NmapInvoker::new(tools.nmap.clone(), scanning)),
    );
    invokers.insert(
        ScanKind::WebProbe,
        Arc::new(NiktoInvoker::new(tools.nikto.clone(), scanning)),
    );
    invokers.insert(
        ScanKind::DirBruteforce,
        Arc::new(GobusterInvoker::new(tools.gobuster.clone(), scanning)),
    );
    invokers.insert(
        ScanKind::SqlInjection,
        Arc::new(SqlmapInvoker::new(tools.sqlmap.clone(), scanning)),
    );
    invokers.insert(
        ScanKind::CmsScan,
        Arc::new(WpscanInvoker::new(tools.wpscan.clone(), scanning)),
    );
    invokers
}

/// Run the tool and capture stdout followed by stderr as one buffer.
pub(crate) async fn capture_output(
    tool: &'static str,
    path: &Path,
    args: &[&str],
) -> Result<(Option<i32>, String), InvokeError> {
    let output = Command::new(path)
        .args(args)
        .stdin(Stdio::null())
        // a dropped run (engine deadline) must not leave the tool behind
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| InvokeError::Spawn { tool, source })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((output.status.code(), combined))
}

/// Standard exit mapping: only a clean zero exit counts as success.
pub(crate) fn require_clean_exit(
    tool: &'static str,
    code: Option<i32>,
    output: String,
) -> Result<String, InvokeError> {
    match code {
        Some(0) => Ok(output),
        code => Err(InvokeError::ToolFailed { tool, code, output }),
    }
}
