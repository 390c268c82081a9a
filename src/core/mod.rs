pub mod admission;
pub mod engine;
pub mod invoker;
pub mod models;

pub use admission::{AdmissionDecision, AdmissionGate, CounterStore, QuotaStatus, StoreError};
pub use engine::ScanEngine;
pub use invoker::{InvokeError, ToolInvoker};
pub use models::{ScanJob, ScanKind, ScanParams, ScanStatus};
