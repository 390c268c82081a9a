use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The external tool a scan job drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanKind {
    PortScan,
    WebProbe,
    DirBruteforce,
    SqlInjection,
    CmsScan,
}

impl ScanKind {
    pub const ALL: [ScanKind; 5] = [
        Self::PortScan,
        Self::WebProbe,
        Self::DirBruteforce,
        Self::SqlInjection,
        Self::CmsScan,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "port-scan" => Some(Self::PortScan),
            "web-probe" => Some(Self::WebProbe),
            "dir-bruteforce" => Some(Self::DirBruteforce),
            "sql-injection" => Some(Self::SqlInjection),
            "cms-scan" => Some(Self::CmsScan),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortScan => "port-scan",
            Self::WebProbe => "web-probe",
            Self::DirBruteforce => "dir-bruteforce",
            Self::SqlInjection => "sql-injection",
            Self::CmsScan => "cms-scan",
        }
    }

    /// Name of the binary backing this scan kind.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::PortScan => "nmap",
            Self::WebProbe => "nikto",
            Self::DirBruteforce => "gobuster",
            Self::SqlInjection => "sqlmap",
            Self::CmsScan => "wpscan",
        }
    }
}

/// Lifecycle state of a scan job. Transitions are monotonic: once a job
/// is `Completed` or `Failed` it never moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Tool-specific submission parameters, captured at submission and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wordlist: Option<String>,
}

/// One submitted scan, tracked from submission to its terminal state.
///
/// Exactly one of `result` / `error_message` is populated once the job is
/// terminal, and `completed_at` is set at the same moment.
#[derive(Debug, Clone, Serialize)]
pub struct ScanJob {
    pub id: String,
    pub owner_id: String,
    pub kind: ScanKind,
    pub target: String,
    pub parameters: ScanParams,
    pub status: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanJob {
    /// Fresh record for a job that is already in flight.
    pub fn new(owner_id: &str, kind: ScanKind, target: &str, parameters: ScanParams) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            owner_id: owner_id.to_string(),
            kind,
            target: target.to_string(),
            parameters,
            status: ScanStatus::Running,
            result: None,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in ScanKind::ALL {
            assert_eq!(ScanKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ScanKind::from_str("xss-scan"), None);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ScanStatus::Pending,
            ScanStatus::Running,
            ScanStatus::Completed,
            ScanStatus::Failed,
        ] {
            assert_eq!(ScanStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ScanStatus::from_str("queued"), None);
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!ScanStatus::Pending.is_terminal());
        assert!(!ScanStatus::Running.is_terminal());
        assert!(ScanStatus::Completed.is_terminal());
        assert!(ScanStatus::Failed.is_terminal());
    }

    #[test]
    fn new_job_starts_running_with_no_terminal_fields() {
        let job = ScanJob::new("alice", ScanKind::PortScan, "example.com", ScanParams::default());
        assert_eq!(job.status, ScanStatus::Running);
        assert!(job.result.is_none());
        assert!(job.error_message.is_none());
        assert!(job.completed_at.is_none());
    }
}
