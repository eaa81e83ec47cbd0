//! In-memory rental platform with scripted instance behaviour.
//!
//! Every call is recorded so callers can assert on the exact sequence of
//! requests. Instance statuses only move once the instance has been powered
//! on: each listing after that pops the next [`MockStep`] of its script, and
//! the last step repeats once the script is exhausted.

use crate::{LoginReply, PlatformError, RentalPlatform, LOGIN_SUCCESS_CODE};
use async_trait::async_trait;
use keeper_common::{Account, InstanceListing, InstanceRecord, InstanceStatus, Session};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Code returned for a wrong password.
pub const MOCK_REJECT_CODE: &str = "PasswordError";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStep {
    /// Listing reports this status for the instance.
    Status(InstanceStatus),
    /// The listing call fails at the transport level.
    ListFailure,
    /// The instance is missing from the listing.
    Missing,
}

impl MockStep {
    pub fn status(raw: &str) -> Self {
        MockStep::Status(InstanceStatus::parse(raw))
    }
}

/// A request observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    LoginFailedCount { phone: String },
    Login { phone: String },
    Passport { ticket: String },
    List { token: String },
    PowerOn { token: String, instance_uuid: String },
    PowerOff { token: String, instance_uuid: String },
}

struct MockAccount {
    phone: String,
    password: String,
    token: String,
}

struct MockInstance {
    token: String,
    uuid: String,
    name: String,
    script: VecDeque<MockStep>,
    current: MockStep,
    powered_on: bool,
}

#[derive(Default)]
struct MockState {
    accounts: Vec<MockAccount>,
    instances: Vec<MockInstance>,
    calls: Vec<MockCall>,
    failing_count_phones: HashSet<String>,
    ticketless_phones: HashSet<String>,
    failing_power_on: HashSet<String>,
    failing_power_off: HashSet<String>,
}

#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform for dry runs: every configured account owns one reserved
    /// instance and one worker that boots, runs and shuts down.
    pub fn demo(accounts: &[Account]) -> Self {
        let mut mock = Self::new();
        for account in accounts {
            let token = format!("mock-token-{}", account.phone);
            mock = mock
                .with_account(&account.phone, &account.password, &token)
                .with_instance(
                    &token,
                    &format!("mock-reserved-{}", account.phone),
                    keeper_common::fleet::DEFAULT_RESERVED_INSTANCE_NAME,
                    Vec::new(),
                )
                .with_instance(
                    &token,
                    &format!("mock-worker-{}", account.phone),
                    "demo-worker",
                    vec![
                        MockStep::status("starting"),
                        MockStep::status("running"),
                        MockStep::status("shutdown"),
                    ],
                );
        }
        mock
    }

    /// Register an account. An empty `token` makes the ticket exchange
    /// return no token.
    pub fn with_account(self, phone: &str, password: &str, token: &str) -> Self {
        self.lock().accounts.push(MockAccount {
            phone: phone.to_string(),
            password: password.to_string(),
            token: token.to_string(),
        });
        self
    }

    /// Add an instance owned by the account holding `token`. It lists as
    /// `shutdown` until powered on, then follows `script`.
    pub fn with_instance(self, token: &str, uuid: &str, name: &str, script: Vec<MockStep>) -> Self {
        self.lock().instances.push(MockInstance {
            token: token.to_string(),
            uuid: uuid.to_string(),
            name: name.to_string(),
            current: MockStep::Status(InstanceStatus::Shutdown),
            script: script.into(),
            powered_on: false,
        });
        self
    }

    pub fn fail_login_failed_count(self, phone: &str) -> Self {
        self.lock().failing_count_phones.insert(phone.to_string());
        self
    }

    /// Accept the login for `phone` but answer without a ticket.
    pub fn without_ticket(self, phone: &str) -> Self {
        self.lock().ticketless_phones.insert(phone.to_string());
        self
    }

    pub fn fail_power_on(self, instance_uuid: &str) -> Self {
        self.lock().failing_power_on.insert(instance_uuid.to_string());
        self
    }

    pub fn fail_power_off(self, instance_uuid: &str) -> Self {
        self.lock().failing_power_off.insert(instance_uuid.to_string());
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn power_on_calls(&self, instance_uuid: &str) -> usize {
        self.count_calls(|c| {
            matches!(c, MockCall::PowerOn { instance_uuid: id, .. } if id == instance_uuid)
        })
    }

    pub fn power_off_calls(&self, instance_uuid: &str) -> usize {
        self.count_calls(|c| {
            matches!(c, MockCall::PowerOff { instance_uuid: id, .. } if id == instance_uuid)
        })
    }

    pub fn list_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, MockCall::List { .. }))
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded calls from others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ticket_for(phone: &str) -> String {
    format!("mock-ticket-{}", phone)
}

#[async_trait]
impl RentalPlatform for MockPlatform {
    async fn login_failed_count(&self, phone: &str) -> Result<serde_json::Value, PlatformError> {
        let mut state = self.lock();
        state.calls.push(MockCall::LoginFailedCount {
            phone: phone.to_string(),
        });
        if state.failing_count_phones.contains(phone) {
            return Err(PlatformError::Transport("connection refused".to_string()));
        }
        Ok(json!({"code": LOGIN_SUCCESS_CODE, "data": {"count": 0}}))
    }

    async fn login(&self, phone: &str, password: &str) -> Result<LoginReply, PlatformError> {
        let mut state = self.lock();
        state.calls.push(MockCall::Login {
            phone: phone.to_string(),
        });
        let accepted = state
            .accounts
            .iter()
            .any(|a| a.phone == phone && a.password == password);
        if accepted {
            let ticket = if state.ticketless_phones.contains(phone) {
                None
            } else {
                Some(ticket_for(phone))
            };
            Ok(LoginReply {
                code: Some(LOGIN_SUCCESS_CODE.to_string()),
                ticket,
            })
        } else {
            Ok(LoginReply {
                code: Some(MOCK_REJECT_CODE.to_string()),
                ticket: None,
            })
        }
    }

    async fn exchange_ticket(&self, ticket: &str) -> Result<Option<String>, PlatformError> {
        let mut state = self.lock();
        state.calls.push(MockCall::Passport {
            ticket: ticket.to_string(),
        });
        Ok(state
            .accounts
            .iter()
            .find(|a| ticket_for(&a.phone) == ticket)
            .map(|a| a.token.clone())
            .filter(|t| !t.is_empty()))
    }

    async fn list_instances(&self, session: &Session) -> Result<InstanceListing, PlatformError> {
        let mut state = self.lock();
        state.calls.push(MockCall::List {
            token: session.token().to_string(),
        });
        if !state.accounts.iter().any(|a| a.token == session.token()) {
            return Err(PlatformError::Malformed("no 'data' in instance listing (code=AuthFailed)".to_string()));
        }

        let mut list = Vec::new();
        let mut failed = false;
        for instance in state
            .instances
            .iter_mut()
            .filter(|i| i.token == session.token())
        {
            if instance.powered_on {
                if let Some(step) = instance.script.pop_front() {
                    instance.current = step;
                }
            }
            match &instance.current {
                MockStep::Status(status) => list.push(InstanceRecord::new(
                    instance.uuid.clone(),
                    instance.name.clone(),
                    status.clone(),
                )),
                MockStep::ListFailure => failed = true,
                MockStep::Missing => {}
            }
        }
        if failed {
            return Err(PlatformError::Transport("connection reset by peer".to_string()));
        }
        Ok(InstanceListing {
            result_total: list.len() as u64,
            list,
        })
    }

    async fn power_on(
        &self,
        session: &Session,
        instance_uuid: &str,
    ) -> Result<serde_json::Value, PlatformError> {
        let mut state = self.lock();
        state.calls.push(MockCall::PowerOn {
            token: session.token().to_string(),
            instance_uuid: instance_uuid.to_string(),
        });
        if state.failing_power_on.contains(instance_uuid) {
            return Err(PlatformError::Transport("connection refused".to_string()));
        }
        if let Some(instance) = state
            .instances
            .iter_mut()
            .find(|i| i.uuid == instance_uuid && i.token == session.token())
        {
            instance.powered_on = true;
        }
        Ok(json!({"code": LOGIN_SUCCESS_CODE, "data": null}))
    }

    async fn power_off(
        &self,
        session: &Session,
        instance_uuid: &str,
    ) -> Result<serde_json::Value, PlatformError> {
        let mut state = self.lock();
        state.calls.push(MockCall::PowerOff {
            token: session.token().to_string(),
            instance_uuid: instance_uuid.to_string(),
        });
        if state.failing_power_off.contains(instance_uuid) {
            return Err(PlatformError::Transport("connection refused".to_string()));
        }
        Ok(json!({"code": LOGIN_SUCCESS_CODE, "data": null}))
    }
}
