use chrono::Utc;
use keeper_common::{fleet, Account, KeeperError};
use keeper_providers::RentalPlatform;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::authenticator;
use crate::cycler::InstanceCycler;
use crate::delay::Delay;
use crate::logger;
use crate::models::{AccountReport, RunSummary};
use crate::settings::Settings;

/// job-keepalive: power-cycle every instance of every configured account.
///
/// Accounts are handled strictly one after another, in configuration order,
/// with `settings.account_gap` between two accounts. A failing account is
/// counted and the run moves on.
pub async fn run(
    platform: &dyn RentalPlatform,
    delay: &dyn Delay,
    settings: &Settings,
) -> RunSummary {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let total = settings.accounts.len();

    async move {
        info!(accounts = total, "keep-alive run started");

        let mut succeeded = 0;
        let mut failed = 0;
        let mut reports = Vec::with_capacity(total);

        for (index, account) in settings.accounts.iter().enumerate() {
            let span = info_span!(
                "account",
                phone = %fleet::mask_phone(&account.phone),
                index = index + 1,
                total
            );
            match process_account(platform, delay, settings, account)
                .instrument(span)
                .await
            {
                Ok(report) => {
                    succeeded += 1;
                    reports.push(report);
                }
                Err(e) => {
                    failed += 1;
                    error!(
                        phone = %fleet::mask_phone(&account.phone),
                        kind = e.kind(),
                        error = %e,
                        "account {}/{} failed",
                        index + 1,
                        total
                    );
                }
            }

            if index + 1 < total {
                info!(gap_secs = settings.account_gap.as_secs(), "waiting before next account");
                delay.pause(settings.account_gap).await;
            }
        }

        info!(succeeded, failed, "keep-alive run finished");
        RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            succeeded,
            failed,
            reports,
        }
    }
    .instrument(info_span!("keepalive", %run_id))
    .await
}

/// Authenticate, list, and cycle one account. Only authentication and the
/// initial listing can fail it.
pub async fn process_account(
    platform: &dyn RentalPlatform,
    delay: &dyn Delay,
    settings: &Settings,
    account: &Account,
) -> Result<AccountReport, KeeperError> {
    let start = Instant::now();
    info!("processing account");

    let session = authenticator::authenticate(platform, account).await?;

    let cycler = InstanceCycler::new(platform, delay, settings.poll, &settings.reserved_name);
    let plan = cycler.plan(&session).await?;

    let mut report = AccountReport {
        phone: account.phone.clone(),
        listed_total: plan.result_total,
        excluded: plan.excluded,
        cycled: Vec::new(),
    };
    if plan.uuids.is_empty() {
        info!("no instances to cycle");
        logger::log_event_complete("PROCESS_ACCOUNT", "success", None, start, None);
        return Ok(report);
    }

    report.cycled = cycler.run(&session, &plan).await;

    let timed_out = report.count("timed_out");
    if timed_out > 0 {
        warn!(timed_out, "some instances did not confirm shutdown");
    }
    info!(
        cycled = report.cycled.len(),
        shutdown = report.count("shutdown"),
        timed_out,
        vanished = report.count("vanished"),
        power_on_failed = report.count("power_on_failed"),
        "all instances processed"
    );
    logger::log_event_complete("PROCESS_ACCOUNT", "success", None, start, None);
    Ok(report)
}
