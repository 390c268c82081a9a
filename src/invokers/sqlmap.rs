use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{capture_output, require_clean_exit};
use crate::config::ScanningConfig;
use crate::core::invoker::{InvokeError, ToolInvoker};
use crate::core::models::{ScanKind, ScanParams};

/// SQL-injection tester. Runs a conservative non-interactive scan:
/// `sqlmap -u <target> --batch --random-agent --level=1 --risk=1`.
pub struct SqlmapInvoker {
    path: PathBuf,
    mock_delay: Duration,
}

impl SqlmapInvoker {
    pub fn new(path: PathBuf, scanning: &ScanningConfig) -> Self {
        Self {
            path,
            mock_delay: scanning.mock_delay(),
        }
    }

    fn mock_output(target: &str) -> String {
        format!("[MOCK] Sqlmap results for {target}:\nTarget is not vulnerable to SQL injection")
    }
}

#[async_trait]
impl ToolInvoker for SqlmapInvoker {
    fn kind(&self) -> ScanKind {
        ScanKind::SqlInjection
    }

    async fn run(&self, target: &str, _params: &ScanParams) -> Result<Value, InvokeError> {
        if !self.path.exists() {
            tokio::time::sleep(self.mock_delay).await;
            return Ok(json!({ "output": Self::mock_output(target) }));
        }

        let (code, output) = capture_output(
            "sqlmap",
            &self.path,
            &[
                "-u",
                target,
                "--batch",
                "--random-agent",
                "--level=1",
                "--risk=1",
            ],
        )
        .await?;
        let output = require_clean_exit("sqlmap", code, output)?;
        Ok(json!({ "output": output }))
    }
}
