use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AdmissionGate, ScanEngine};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub engine: Arc<ScanEngine>,
    pub gate: Arc<AdmissionGate>,
}

impl AppContext {
    pub fn new(config: Arc<AppConfig>, engine: ScanEngine, gate: AdmissionGate) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
            gate: Arc::new(gate),
        }
    }
}
