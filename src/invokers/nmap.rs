use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{capture_output, require_clean_exit};
use crate::config::ScanningConfig;
use crate::core::invoker::{InvokeError, ToolInvoker};
use crate::core::models::{ScanKind, ScanParams};

/// Port scanner. Runs `nmap -p <ports> -sV <target>` with service
/// detection; the submitted port range rides along in the result.
pub struct NmapInvoker {
    path: PathBuf,
    mock_delay: Duration,
    default_ports: String,
}

impl NmapInvoker {
    pub fn new(path: PathBuf, scanning: &ScanningConfig) -> Self {
        Self {
            path,
            mock_delay: scanning.mock_delay(),
            default_ports: scanning.default_ports.clone(),
        }
    }

    fn mock_output(target: &str, ports: &str) -> String {
        format!(
            "[MOCK] Nmap scan for {target} ports {ports}\n\
             Host is up (0.001s latency).\n\
             PORT STATE SERVICE\n\
             80/tcp open http\n\
             443/tcp open https"
        )
    }
}

#[async_trait]
impl ToolInvoker for NmapInvoker {
    fn kind(&self) -> ScanKind {
        ScanKind::PortScan
    }

    async fn run(&self, target: &str, params: &ScanParams) -> Result<Value, InvokeError> {
        let ports = params.ports.as_deref().unwrap_or(&self.default_ports);

        if !self.path.exists() {
            tokio::time::sleep(self.mock_delay).await;
            return Ok(json!({
                "output": Self::mock_output(target, ports),
                "ports": ports,
            }));
        }

        let (code, output) =
            capture_output("nmap", &self.path, &["-p", ports, "-sV", target]).await?;
        let output = require_clean_exit("nmap", code, output)?;
        Ok(json!({ "output": output, "ports": ports }))
    }
}
