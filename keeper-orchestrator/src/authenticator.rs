use keeper_common::{Account, KeeperError, Session};
use keeper_providers::{RentalPlatform, LOGIN_SUCCESS_CODE};
use std::time::Instant;
use tracing::debug;

use crate::logger;

/// Run the three-step login handshake for one account.
///
/// 1. failed-login counter (informational, but a transport failure aborts)
/// 2. credential submission, must answer `code == "Success"` with a ticket
/// 3. ticket exchange for the session token
///
/// No step is retried.
pub async fn authenticate(
    platform: &dyn RentalPlatform,
    account: &Account,
) -> Result<Session, KeeperError> {
    let start = Instant::now();

    logger::log_event("LOGIN_FAILED_COUNT", "in_progress", None, None);
    match platform.login_failed_count(&account.phone).await {
        Ok(body) => debug!(response = %body, "login failure counter"),
        Err(e) => {
            let err = KeeperError::from(e);
            logger::log_event_complete("LOGIN_FAILED_COUNT", "failed", None, start, Some(&err.to_string()));
            return Err(err);
        }
    }

    logger::log_event("LOGIN", "in_progress", None, None);
    let reply = platform
        .login(&account.phone, &account.password)
        .await
        .map_err(|e| fail("LOGIN", start, KeeperError::from(e)))?;
    let code = reply.code.as_deref().unwrap_or("none");
    if code != LOGIN_SUCCESS_CODE {
        return Err(fail(
            "LOGIN",
            start,
            KeeperError::Auth(format!("login rejected with code {}", code)),
        ));
    }
    let ticket = reply.ticket.ok_or_else(|| {
        fail(
            "LOGIN",
            start,
            KeeperError::Auth("no ticket in login response".to_string()),
        )
    })?;

    logger::log_event("PASSPORT", "in_progress", None, None);
    let token = platform
        .exchange_ticket(&ticket)
        .await
        .map_err(|e| fail("PASSPORT", start, KeeperError::from(e)))?
        .ok_or_else(|| {
            fail(
                "PASSPORT",
                start,
                KeeperError::Auth("no token in passport response".to_string()),
            )
        })?;

    let session = Session::new(token);
    debug!(token_prefix = %session.token_prefix(), "session established");
    logger::log_event_complete("AUTHENTICATE", "success", None, start, None);
    Ok(session)
}

fn fail(action_type: &str, start: Instant, err: KeeperError) -> KeeperError {
    logger::log_event_complete(action_type, "failed", None, start, Some(&err.to_string()));
    err
}
