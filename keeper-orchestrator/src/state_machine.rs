use keeper_common::InstanceStatus;
use tracing::info;

/// Where one instance is in its power cycle.
///
/// Entered as `PoweringOn` right after the power-on request. `Shutdown`,
/// `TimedOut` and `Vanished` are terminal; none of them fails the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    PoweringOn,
    Starting,
    Running,
    OffRequested,
    Shutdown,
    TimedOut,
    Vanished,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::PoweringOn => "powering_on",
            CycleState::Starting => "starting",
            CycleState::Running => "running",
            CycleState::OffRequested => "off_requested",
            CycleState::Shutdown => "shutdown",
            CycleState::TimedOut => "timed_out",
            CycleState::Vanished => "vanished",
        }
    }
}

/// What the poll loop does after one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Send power-off, then re-poll immediately.
    RequestPowerOff,
    /// Pause for the poll interval, then re-poll.
    Wait,
    /// Shutdown confirmed.
    Finish,
    /// Instance no longer listed.
    Abandon,
}

/// Next state and action for an observed status. `None` means the instance
/// was absent from an otherwise successful listing.
pub fn next(current: CycleState, observed: Option<&InstanceStatus>) -> (CycleState, PollAction) {
    match observed {
        Some(InstanceStatus::Running) => {
            // Still running after power-off was sent: keep the state, ask again.
            let state = if current == CycleState::OffRequested {
                CycleState::OffRequested
            } else {
                CycleState::Running
            };
            (state, PollAction::RequestPowerOff)
        }
        Some(InstanceStatus::Shutdown) => (CycleState::Shutdown, PollAction::Finish),
        Some(InstanceStatus::Starting) | Some(InstanceStatus::Other(_)) => {
            (CycleState::Starting, PollAction::Wait)
        }
        None => (CycleState::Vanished, PollAction::Abandon),
    }
}

/// Record a state transition for one instance.
pub fn log_state_transition(instance_uuid: &str, from: CycleState, to: CycleState, reason: &str) {
    info!(
        instance_uuid,
        from = from.as_str(),
        to = to.as_str(),
        reason,
        "instance {} {} -> {}",
        instance_uuid,
        from.as_str(),
        to.as_str()
    );
}
