//! Server state

use std::sync::Arc;

use crate::jobs::launcher::JobLauncher;
use crate::jobs::reporter::StatusReporter;

/// Server state shared across handlers
pub struct ServerState {
    pub launcher: Arc<JobLauncher>,
    pub reporter: Arc<StatusReporter>,
}

impl ServerState {
    pub fn new(launcher: Arc<JobLauncher>, reporter: Arc<StatusReporter>) -> Self {
        Self { launcher, reporter }
    }
}
