// Common test fixtures for keep-alive runs against the in-memory platform.
#![allow(dead_code)]

use keeper_common::Account;
use keeper_orchestrator::models::PollPolicy;
use keeper_orchestrator::settings::Settings;
use keeper_providers::mock::MockStep;
use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const ACCOUNT_GAP: Duration = Duration::from_secs(5);

/// Settings with the production timing constants and the given accounts.
pub fn settings_for(accounts: &[(&str, &str)]) -> Settings {
    let mut settings = Settings::with_accounts(
        accounts
            .iter()
            .map(|(phone, password)| Account::new(*phone, *password))
            .collect(),
    );
    settings.poll = PollPolicy {
        interval: POLL_INTERVAL,
        max_checks: 20,
    };
    settings.account_gap = ACCOUNT_GAP;
    settings
}

pub fn steps(raw: &[&str]) -> Vec<MockStep> {
    raw.iter().map(|s| MockStep::status(s)).collect()
}
