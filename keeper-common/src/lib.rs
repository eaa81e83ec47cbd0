use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod fleet;

pub use error::KeeperError;

// --- Enums ---

/// Lifecycle status reported by the rental platform for one instance.
///
/// Only three values drive the power cycle; everything else is kept verbatim
/// so it can be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Starting,
    Running,
    Shutdown,
    Other(String),
}

impl InstanceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "starting" => InstanceStatus::Starting,
            "running" => InstanceStatus::Running,
            "shutdown" => InstanceStatus::Shutdown,
            other => InstanceStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InstanceStatus::Starting => "starting",
            InstanceStatus::Running => "running",
            InstanceStatus::Shutdown => "shutdown",
            InstanceStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Entities ---

/// One platform account. Loaded from configuration, immutable for the run.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub phone: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Account {
    pub fn new(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("phone", &fleet::mask_phone(&self.phone))
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authorization context for one account. Never persisted, dropped once the
/// account has been processed.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Raw value for the `authorization` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// First 12 characters, safe to log.
    pub fn token_prefix(&self) -> String {
        self.token.chars().take(12).collect()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token_prefix", &self.token_prefix())
            .finish()
    }
}

/// Snapshot of one rented instance as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub uuid: String,
    pub name: String,
    pub status: InstanceStatus,
}

impl InstanceRecord {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, status: InstanceStatus) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            status,
        }
    }
}

/// First page of the instance listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceListing {
    pub result_total: u64,
    pub list: Vec<InstanceRecord>,
}

impl InstanceListing {
    pub fn find(&self, uuid: &str) -> Option<&InstanceRecord> {
        self.list.iter().find(|i| i.uuid == uuid)
    }
}

/// How the power cycle of a single instance ended. None of these fail the
/// account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Instance confirmed shut down after `polls` status checks.
    Shutdown { polls: u32 },
    /// Polling bound exhausted before shutdown was observed.
    TimedOut { polls: u32 },
    /// Instance disappeared from the listing while being polled.
    Vanished { polls: u32 },
    /// Power-on could not be sent; the instance was not polled.
    PowerOnFailed { error: KeeperError },
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Shutdown { .. } => "shutdown",
            CycleOutcome::TimedOut { .. } => "timed_out",
            CycleOutcome::Vanished { .. } => "vanished",
            CycleOutcome::PowerOnFailed { .. } => "power_on_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_roundtrip() {
        for (s, st) in [
            ("starting", InstanceStatus::Starting),
            ("running", InstanceStatus::Running),
            ("shutdown", InstanceStatus::Shutdown),
        ] {
            assert_eq!(InstanceStatus::parse(s), st);
            assert_eq!(st.as_str(), s);
        }
        assert_eq!(
            InstanceStatus::parse("re_initializing"),
            InstanceStatus::Other("re_initializing".to_string())
        );
        assert_eq!(InstanceStatus::parse("Running").as_str(), "Running");
    }

    #[test]
    fn account_debug_hides_password() {
        let account = Account::new("13812345678", "hunter2");
        let dbg = format!("{:?}", account);
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("13812345678"));
        assert!(dbg.contains("138****5678"));
    }

    #[test]
    fn account_deserializes_from_config_json() {
        let accounts: Vec<Account> = serde_json::from_str(
            r#"[{"phone":"13800000001","password":"a"},{"phone":"13800000002","password":"b"}]"#,
        )
        .unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].phone, "13800000001");
        assert_eq!(accounts[1].password, "b");
    }

    #[test]
    fn session_debug_shows_prefix_only() {
        let session = Session::new("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(session.token(), "abcdefghijklmnopqrstuvwxyz");
        assert_eq!(session.token_prefix(), "abcdefghijkl");
        assert!(!format!("{:?}", session).contains("mnop"));
    }

    #[test]
    fn listing_find_by_uuid() {
        let listing = InstanceListing {
            result_total: 2,
            list: vec![
                InstanceRecord::new("a", "one", InstanceStatus::Shutdown),
                InstanceRecord::new("b", "two", InstanceStatus::Running),
            ],
        };
        assert_eq!(listing.find("b").map(|i| &i.status), Some(&InstanceStatus::Running));
        assert!(listing.find("c").is_none());
    }
}
