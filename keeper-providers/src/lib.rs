use async_trait::async_trait;
use keeper_common::{InstanceListing, KeeperError, Session};
use thiserror::Error;

pub mod wire;

/// Errors raised by a [`RentalPlatform`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The request never produced a response (DNS, TLS, connect, timeout).
    #[error("transport: {0}")]
    Transport(String),
    /// A response arrived but its body was not the expected JSON.
    #[error("decode: {0}")]
    Decode(String),
    /// Valid JSON missing a required part (e.g. the `data` object).
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<PlatformError> for KeeperError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Transport(msg) | PlatformError::Decode(msg) => {
                KeeperError::Transport(msg)
            }
            PlatformError::Malformed(msg) => KeeperError::Listing(msg),
        }
    }
}

/// Outcome of the credential submission step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginReply {
    /// Result code reported by the platform; `"Success"` when accepted.
    pub code: Option<String>,
    pub ticket: Option<String>,
}

/// Code returned by the login endpoint when the credentials were accepted.
pub const LOGIN_SUCCESS_CODE: &str = "Success";

/// Billing tag sent with every power-on request.
pub const POWER_ON_PAYLOAD: &str = "non_gpu";

/// The remote surface of the rental platform, one method per endpoint.
///
/// Implementations do not interpret results beyond decoding them; deciding
/// what a rejected login or an odd status means is up to the caller.
#[async_trait]
pub trait RentalPlatform: Send + Sync {
    /// Informational pre-login call. Only transport/decode failures matter.
    async fn login_failed_count(&self, phone: &str) -> Result<serde_json::Value, PlatformError>;

    async fn login(&self, phone: &str, password: &str) -> Result<LoginReply, PlatformError>;

    /// Trade a login ticket for a session token. `Ok(None)` when the
    /// response carries no token.
    async fn exchange_ticket(&self, ticket: &str) -> Result<Option<String>, PlatformError>;

    /// First page of the account's instances (page size 100, no filters).
    async fn list_instances(&self, session: &Session) -> Result<InstanceListing, PlatformError>;

    async fn power_on(
        &self,
        session: &Session,
        instance_uuid: &str,
    ) -> Result<serde_json::Value, PlatformError>;

    async fn power_off(
        &self,
        session: &Session,
        instance_uuid: &str,
    ) -> Result<serde_json::Value, PlatformError>;
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "autodl")]
pub mod autodl;
