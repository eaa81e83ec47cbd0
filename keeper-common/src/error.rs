use thiserror::Error;

/// Failure taxonomy for one keep-alive run.
///
/// `Transport` and `Auth` abort the current account. `Listing` does too when
/// it happens before cycling starts. `Action` and `Timeout` only concern a
/// single instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeeperError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("malformed instance listing: {0}")]
    Listing(String),
    #[error("{action} failed for instance {instance_uuid}: {reason}")]
    Action {
        action: &'static str,
        instance_uuid: String,
        reason: String,
    },
    #[error("instance {instance_uuid} not shut down after {checks} status checks")]
    Timeout { instance_uuid: String, checks: u32 },
}

impl KeeperError {
    /// Short machine-friendly label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            KeeperError::Transport(_) => "transport",
            KeeperError::Auth(_) => "auth",
            KeeperError::Listing(_) => "listing",
            KeeperError::Action { .. } => "action",
            KeeperError::Timeout { .. } => "timeout",
        }
    }
}
