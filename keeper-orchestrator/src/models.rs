use chrono::{DateTime, Utc};
use keeper_common::CycleOutcome;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Pause between two status polls of the same instance.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Status polls allowed per instance before giving up.
pub const DEFAULT_MAX_STATUS_CHECKS: u32 = 20;
/// Pause between two accounts.
pub const DEFAULT_ACCOUNT_GAP: Duration = Duration::from_secs(5);

/// Bounded polling parameters for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_checks: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_checks: DEFAULT_MAX_STATUS_CHECKS,
        }
    }
}

/// What happened to one account that got past authentication and listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountReport {
    pub phone: String,
    pub listed_total: u64,
    pub excluded: usize,
    pub cycled: Vec<(String, CycleOutcome)>,
}

impl AccountReport {
    pub fn count(&self, outcome: &str) -> usize {
        self.cycled.iter().filter(|(_, o)| o.as_str() == outcome).count()
    }
}

/// Final tally of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(skip)]
    pub reports: Vec<AccountReport>,
}
