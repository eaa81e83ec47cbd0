use std::time::Instant;
use tracing::{info, warn};

/// Action logger for the keeper: one structured event per step.
///
/// `action_type` is an upper-case verb such as `LOGIN` or `POWER_ON`;
/// `status` is one of `in_progress`, `success`, `failed`, `skipped`.
pub fn log_event(
    action_type: &str,
    status: &str,
    instance_uuid: Option<&str>,
    error_message: Option<&str>,
) {
    let instance_uuid = instance_uuid.unwrap_or("-");
    match error_message {
        Some(error) => warn!(
            action = action_type,
            status,
            instance_uuid,
            error,
            "{} {}",
            action_type,
            status
        ),
        None => info!(
            action = action_type,
            status,
            instance_uuid,
            "{} {}",
            action_type,
            status
        ),
    }
}

/// Log event completion with duration
pub fn log_event_complete(
    action_type: &str,
    status: &str,
    instance_uuid: Option<&str>,
    started: Instant,
    error_message: Option<&str>,
) {
    let duration_ms = started.elapsed().as_millis() as u64;
    let instance_uuid = instance_uuid.unwrap_or("-");
    match error_message {
        Some(error) => warn!(
            action = action_type,
            status,
            instance_uuid,
            duration_ms,
            error,
            "{} {}",
            action_type,
            status
        ),
        None => info!(
            action = action_type,
            status,
            instance_uuid,
            duration_ms,
            "{} {}",
            action_type,
            status
        ),
    }
}
