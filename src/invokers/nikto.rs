use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{capture_output, require_clean_exit};
use crate::config::ScanningConfig;
use crate::core::invoker::{InvokeError, ToolInvoker};
use crate::core::models::{ScanKind, ScanParams};

/// Web-server prober. Runs `nikto -h <target> -Format json` and keeps
/// the report as structured JSON when the tool produces valid output.
pub struct NiktoInvoker {
    path: PathBuf,
    mock_delay: Duration,
}

impl NiktoInvoker {
    pub fn new(path: PathBuf, scanning: &ScanningConfig) -> Self {
        Self {
            path,
            mock_delay: scanning.mock_delay(),
        }
    }

    fn mock_report(target: &str) -> Value {
        json!({
            "host": target,
            "ip": "127.0.0.1",
            "vulnerabilities": [
                "[MOCK] nikto report, binary not installed",
                "No CGI Directories found (use '-C all' to force check all possible dirs)",
                "Allowed HTTP Methods: GET, HEAD, POST, OPTIONS",
                "OSVDB-3092: /admin/: This might be interesting...",
            ],
        })
    }
}

#[async_trait]
impl ToolInvoker for NiktoInvoker {
    fn kind(&self) -> ScanKind {
        ScanKind::WebProbe
    }

    async fn run(&self, target: &str, _params: &ScanParams) -> Result<Value, InvokeError> {
        if !self.path.exists() {
            tokio::time::sleep(self.mock_delay).await;
            return Ok(Self::mock_report(target));
        }

        let (code, output) =
            capture_output("nikto", &self.path, &["-h", target, "-Format", "json"]).await?;
        let output = require_clean_exit("nikto", code, output)?;

        // nikto emits JSON when asked to, but interleaved warnings can
        // spoil it; fall back to the raw text in that case
        Ok(serde_json::from_str(&output).unwrap_or_else(|_| json!({ "output": output })))
    }
}
