use keeper_common::{fleet, CycleOutcome, KeeperError, Session};
use keeper_providers::RentalPlatform;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::delay::Delay;
use crate::logger;
use crate::models::PollPolicy;
use crate::state_machine::{self, CycleState, PollAction};

/// Instances selected for cycling from the first listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclePlan {
    pub result_total: u64,
    pub excluded: usize,
    pub uuids: Vec<String>,
}

/// Lists an account's instances and power-cycles them one at a time.
pub struct InstanceCycler<'a> {
    platform: &'a dyn RentalPlatform,
    delay: &'a dyn Delay,
    policy: PollPolicy,
    reserved_name: &'a str,
}

impl<'a> InstanceCycler<'a> {
    pub fn new(
        platform: &'a dyn RentalPlatform,
        delay: &'a dyn Delay,
        policy: PollPolicy,
        reserved_name: &'a str,
    ) -> Self {
        Self {
            platform,
            delay,
            policy,
            reserved_name,
        }
    }

    /// Fetch the listing once and select the instances to cycle, keeping
    /// listing order. The reserved instance and entries without a uuid are
    /// left out.
    pub async fn plan(&self, session: &Session) -> Result<CyclePlan, KeeperError> {
        let start = Instant::now();
        let listing = self.platform.list_instances(session).await.map_err(|e| {
            let err = KeeperError::from(e);
            logger::log_event_complete("LIST_INSTANCES", "failed", None, start, Some(&err.to_string()));
            err
        })?;
        info!(result_total = listing.result_total, listed = listing.list.len(), "instance listing fetched");

        let (uuids, excluded) = fleet::cyclable_uuids(&listing.list, self.reserved_name);
        if excluded > 0 {
            info!(excluded, reserved_name = self.reserved_name, "excluded reserved or unnamed instances");
        }
        info!(count = uuids.len(), uuids = ?uuids, "instances selected for cycling");
        logger::log_event_complete("LIST_INSTANCES", "success", None, start, None);

        Ok(CyclePlan {
            result_total: listing.result_total,
            excluded,
            uuids,
        })
    }

    /// Cycle every planned instance in order. Per-instance failures are
    /// reported in the outcome and never stop the loop.
    pub async fn run(&self, session: &Session, plan: &CyclePlan) -> Vec<(String, CycleOutcome)> {
        let total = plan.uuids.len();
        let mut outcomes = Vec::with_capacity(total);
        for (index, uuid) in plan.uuids.iter().enumerate() {
            info!(instance_uuid = %uuid, "processing instance {}/{}", index + 1, total);
            let outcome = self.cycle(session, uuid).await;
            outcomes.push((uuid.clone(), outcome));
        }
        outcomes
    }

    /// Power-on, poll until running, power-off, poll until shutdown.
    pub async fn cycle(&self, session: &Session, uuid: &str) -> CycleOutcome {
        let start = Instant::now();

        logger::log_event("POWER_ON", "in_progress", Some(uuid), None);
        match self.platform.power_on(session, uuid).await {
            Ok(body) => debug!(instance_uuid = uuid, response = %body, "power-on accepted"),
            Err(e) => {
                let error = KeeperError::Action {
                    action: "power_on",
                    instance_uuid: uuid.to_string(),
                    reason: e.to_string(),
                };
                logger::log_event_complete("POWER_ON", "skipped", Some(uuid), start, Some(&error.to_string()));
                return CycleOutcome::PowerOnFailed { error };
            }
        }

        let max_checks = self.policy.max_checks;
        let mut state = CycleState::PoweringOn;
        for attempt in 1..=max_checks {
            debug!(instance_uuid = uuid, attempt, max_checks, "checking instance status");

            let listing = match self.platform.list_instances(session).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(instance_uuid = uuid, attempt, error = %e, "status check failed, retrying");
                    self.delay.pause(self.policy.interval).await;
                    continue;
                }
            };
            let observed = listing.find(uuid).map(|i| i.status.clone());
            if let Some(status) = &observed {
                debug!(instance_uuid = uuid, attempt, status = %status, "instance status");
            }

            let (next, action) = state_machine::next(state, observed.as_ref());
            if next != state {
                let reason = match &observed {
                    Some(status) => format!("observed status '{}'", status),
                    None => "missing from instance listing".to_string(),
                };
                state_machine::log_state_transition(uuid, state, next, &reason);
                state = next;
            }

            match action {
                PollAction::RequestPowerOff => match self.platform.power_off(session, uuid).await {
                    Ok(body) => {
                        debug!(instance_uuid = uuid, response = %body, "power-off accepted");
                        if state == CycleState::Running {
                            state_machine::log_state_transition(
                                uuid,
                                state,
                                CycleState::OffRequested,
                                "power-off sent",
                            );
                            state = CycleState::OffRequested;
                        }
                    }
                    Err(e) => {
                        let error = KeeperError::Action {
                            action: "power_off",
                            instance_uuid: uuid.to_string(),
                            reason: e.to_string(),
                        };
                        logger::log_event("POWER_OFF", "failed", Some(uuid), Some(&error.to_string()));
                    }
                },
                PollAction::Wait => {
                    self.delay.pause(self.policy.interval).await;
                }
                PollAction::Finish => {
                    logger::log_event_complete("CYCLE_INSTANCE", "success", Some(uuid), start, None);
                    return CycleOutcome::Shutdown { polls: attempt };
                }
                PollAction::Abandon => {
                    logger::log_event_complete(
                        "CYCLE_INSTANCE",
                        "vanished",
                        Some(uuid),
                        start,
                        Some("instance disappeared from listing while polling"),
                    );
                    return CycleOutcome::Vanished { polls: attempt };
                }
            }
        }

        state_machine::log_state_transition(uuid, state, CycleState::TimedOut, "status check bound reached");
        let error = KeeperError::Timeout {
            instance_uuid: uuid.to_string(),
            checks: max_checks,
        };
        logger::log_event_complete("CYCLE_INSTANCE", "timed_out", Some(uuid), start, Some(&error.to_string()));
        CycleOutcome::TimedOut { polls: max_checks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::RecordingDelay;
    use keeper_providers::mock::{MockPlatform, MockStep};
    use std::time::Duration;

    fn steps(raw: &[&str]) -> Vec<MockStep> {
        raw.iter().map(|s| MockStep::status(s)).collect()
    }

    #[tokio::test]
    async fn plan_keeps_listing_order_and_skips_reserved() {
        let mock = MockPlatform::new()
            .with_account("p", "pw", "t")
            .with_instance("t", "u-b", "beta", vec![])
            .with_instance("t", "u-r", "AutoDLKeeper", vec![])
            .with_instance("t", "u-a", "alpha", vec![]);
        let delay = RecordingDelay::new();
        let cycler = InstanceCycler::new(&mock, &delay, PollPolicy::default(), "AutoDLKeeper");

        let plan = cycler.plan(&Session::new("t")).await.unwrap();
        assert_eq!(plan.uuids, vec!["u-b", "u-a"]);
        assert_eq!(plan.excluded, 1);
        assert_eq!(plan.result_total, 3);
    }

    #[tokio::test]
    async fn plan_fails_on_malformed_listing() {
        let mock = MockPlatform::new().with_account("p", "pw", "t");
        let delay = RecordingDelay::new();
        let cycler = InstanceCycler::new(&mock, &delay, PollPolicy::default(), "AutoDLKeeper");

        let err = cycler.plan(&Session::new("expired")).await.unwrap_err();
        assert!(matches!(err, KeeperError::Listing(_)));
    }

    #[tokio::test]
    async fn power_off_failure_keeps_polling() {
        let mock = MockPlatform::new()
            .with_account("p", "pw", "t")
            .with_instance("t", "u1", "w", steps(&["running", "running", "shutdown"]))
            .fail_power_off("u1");
        let delay = RecordingDelay::new();
        let cycler = InstanceCycler::new(&mock, &delay, PollPolicy::default(), "AutoDLKeeper");

        let outcome = cycler.cycle(&Session::new("t"), "u1").await;
        assert_eq!(outcome, CycleOutcome::Shutdown { polls: 3 });
        assert_eq!(mock.power_off_calls("u1"), 2);
        assert!(delay.pauses().is_empty());
    }

    #[tokio::test]
    async fn list_failure_consumes_an_attempt_and_waits() {
        let mock = MockPlatform::new().with_account("p", "pw", "t").with_instance(
            "t",
            "u1",
            "w",
            vec![
                MockStep::ListFailure,
                MockStep::status("running"),
                MockStep::status("shutdown"),
            ],
        );
        let delay = RecordingDelay::new();
        let policy = PollPolicy {
            interval: Duration::from_secs(3),
            max_checks: 20,
        };
        let cycler = InstanceCycler::new(&mock, &delay, policy, "AutoDLKeeper");

        let outcome = cycler.cycle(&Session::new("t"), "u1").await;
        assert_eq!(outcome, CycleOutcome::Shutdown { polls: 3 });
        assert_eq!(delay.pauses(), vec![Duration::from_secs(3)]);
        assert_eq!(mock.list_calls(), 3);
    }

    #[tokio::test]
    async fn vanished_instance_stops_polling() {
        let mock = MockPlatform::new().with_account("p", "pw", "t").with_instance(
            "t",
            "u1",
            "w",
            vec![MockStep::status("starting"), MockStep::Missing],
        );
        let delay = RecordingDelay::new();
        let cycler = InstanceCycler::new(&mock, &delay, PollPolicy::default(), "AutoDLKeeper");

        let outcome = cycler.cycle(&Session::new("t"), "u1").await;
        assert_eq!(outcome, CycleOutcome::Vanished { polls: 2 });
        assert_eq!(mock.list_calls(), 2);
        assert_eq!(mock.power_off_calls("u1"), 0);
    }

    #[tokio::test]
    async fn unknown_status_waits_like_starting() {
        let mock = MockPlatform::new()
            .with_account("p", "pw", "t")
            .with_instance("t", "u1", "w", steps(&["re_initializing", "shutdown"]));
        let delay = RecordingDelay::new();
        let cycler = InstanceCycler::new(&mock, &delay, PollPolicy::default(), "AutoDLKeeper");

        let outcome = cycler.cycle(&Session::new("t"), "u1").await;
        assert_eq!(outcome, CycleOutcome::Shutdown { polls: 2 });
        assert_eq!(delay.pauses(), vec![Duration::from_secs(3)]);
        assert_eq!(mock.power_off_calls("u1"), 0);
    }

    #[tokio::test]
    async fn custom_bound_is_honoured() {
        let mock = MockPlatform::new()
            .with_account("p", "pw", "t")
            .with_instance("t", "u1", "w", steps(&["starting"]));
        let delay = RecordingDelay::new();
        let policy = PollPolicy {
            interval: Duration::from_millis(10),
            max_checks: 4,
        };
        let cycler = InstanceCycler::new(&mock, &delay, policy, "AutoDLKeeper");

        let outcome = cycler.cycle(&Session::new("t"), "u1").await;
        assert_eq!(outcome, CycleOutcome::TimedOut { polls: 4 });
        assert_eq!(mock.list_calls(), 4);
        assert_eq!(delay.count(Duration::from_millis(10)), 4);
    }
}
