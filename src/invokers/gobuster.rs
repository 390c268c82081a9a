use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{capture_output, require_clean_exit};
use crate::config::ScanningConfig;
use crate::core::invoker::{InvokeError, ToolInvoker};
use crate::core::models::{ScanKind, ScanParams};

/// Directory brute-forcer. Runs `gobuster dir -u <target> -w <wordlist>
/// -q`; an empty wordlist parameter falls back to the configured default.
pub struct GobusterInvoker {
    path: PathBuf,
    mock_delay: Duration,
    default_wordlist: String,
}

impl GobusterInvoker {
    pub fn new(path: PathBuf, scanning: &ScanningConfig) -> Self {
        Self {
            path,
            mock_delay: scanning.mock_delay(),
            default_wordlist: scanning.default_wordlist.clone(),
        }
    }

    fn mock_output(target: &str) -> String {
        format!(
            "[MOCK] Gobuster results for {target}:\n\
             /images (Status: 200)\n\
             /css (Status: 200)\n\
             /js (Status: 200)\n\
             /admin (Status: 301)"
        )
    }
}

#[async_trait]
impl ToolInvoker for GobusterInvoker {
    fn kind(&self) -> ScanKind {
        ScanKind::DirBruteforce
    }

    async fn run(&self, target: &str, params: &ScanParams) -> Result<Value, InvokeError> {
        let wordlist = match params.wordlist.as_deref() {
            Some(list) if !list.is_empty() => list,
            _ => self.default_wordlist.as_str(),
        };

        if !self.path.exists() {
            tokio::time::sleep(self.mock_delay).await;
            return Ok(json!({
                "output": Self::mock_output(target),
                "wordlist": wordlist,
            }));
        }

        let (code, output) = capture_output(
            "gobuster",
            &self.path,
            &["dir", "-u", target, "-w", wordlist, "-q"],
        )
        .await?;
        let output = require_clean_exit("gobuster", code, output)?;
        Ok(json!({ "output": output, "wordlist": wordlist }))
    }
}
