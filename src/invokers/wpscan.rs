use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::capture_output;
use crate::config::ScanningConfig;
use crate::core::invoker::{InvokeError, ToolInvoker};
use crate::core::models::{ScanKind, ScanParams};

/// CMS vulnerability scanner. Runs `wpscan --url <target> --no-update
/// --stealthy`.
///
/// wpscan does not follow the usual exit convention: codes 2, 3 and 4
/// mean the scan ran to completion and found something, so they are
/// successes with the report kept as the result. Only the remaining
/// non-zero codes are real failures.
pub struct WpscanInvoker {
    path: PathBuf,
    mock_delay: Duration,
}

impl WpscanInvoker {
    pub fn new(path: PathBuf, scanning: &ScanningConfig) -> Self {
        Self {
            path,
            mock_delay: scanning.mock_delay(),
        }
    }

    fn mock_output(target: &str) -> String {
        format!(
            "[MOCK] WPScan results for {target}:\n\
             [+] WordPress version 5.8 identified (Latest, released on 2021-07-20)"
        )
    }
}

/// wpscan's exit mapping: 0 is a clean scan, 2/3/4 are completed scans
/// with findings, anything else failed.
fn classify_exit(code: Option<i32>, output: String) -> Result<String, InvokeError> {
    match code {
        Some(0) | Some(2) | Some(3) | Some(4) => Ok(output),
        code => Err(InvokeError::ToolFailed {
            tool: "wpscan",
            code,
            output,
        }),
    }
}

#[async_trait]
impl ToolInvoker for WpscanInvoker {
    fn kind(&self) -> ScanKind {
        ScanKind::CmsScan
    }

    async fn run(&self, target: &str, _params: &ScanParams) -> Result<Value, InvokeError> {
        if !self.path.exists() {
            tokio::time::sleep(self.mock_delay).await;
            return Ok(json!({ "output": Self::mock_output(target) }));
        }

        let (code, output) = capture_output(
            "wpscan",
            &self.path,
            &["--url", target, "--no-update", "--stealthy"],
        )
        .await?;
        let output = classify_exit(code, output)?;
        Ok(json!({ "output": output }))
    }
}
