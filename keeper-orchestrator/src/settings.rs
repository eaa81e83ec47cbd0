use anyhow::{bail, Context, Result};
use keeper_common::{fleet, Account};
use keeper_providers::wire;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use crate::models::{PollPolicy, DEFAULT_ACCOUNT_GAP, DEFAULT_MAX_STATUS_CHECKS, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_ACCOUNTS_FILE: &str = "/run/secrets/keeper_accounts.json";
pub const DEFAULT_PROVIDER: &str = "autodl";

/// Everything a run needs, resolved before the first network call.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: String,
    pub api_base_url: String,
    pub reserved_name: String,
    pub poll: PollPolicy,
    pub account_gap: Duration,
    pub accounts: Vec<Account>,
}

impl Settings {
    /// Defaults everywhere, with the given accounts.
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            api_base_url: wire::DEFAULT_BASE_URL.to_string(),
            reserved_name: fleet::DEFAULT_RESERVED_INSTANCE_NAME.to_string(),
            poll: PollPolicy::default(),
            account_gap: DEFAULT_ACCOUNT_GAP,
            accounts,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = get("KEEPER_PROVIDER")
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
            .to_ascii_lowercase();
        let api_base_url = get("KEEPER_API_BASE_URL").unwrap_or_else(|| wire::DEFAULT_BASE_URL.to_string());
        let reserved_name = fleet::parse_reserved_name(get("KEEPER_RESERVED_NAME").as_deref());

        let interval_secs: u64 = parse_or(
            get("KEEPER_POLL_INTERVAL_SECS"),
            "KEEPER_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL.as_secs(),
        )?;
        let max_checks: u32 = parse_or(
            get("KEEPER_MAX_STATUS_CHECKS"),
            "KEEPER_MAX_STATUS_CHECKS",
            DEFAULT_MAX_STATUS_CHECKS,
        )?;
        if max_checks == 0 {
            bail!("KEEPER_MAX_STATUS_CHECKS must be at least 1");
        }
        let gap_secs: u64 = parse_or(
            get("KEEPER_ACCOUNT_GAP_SECS"),
            "KEEPER_ACCOUNT_GAP_SECS",
            DEFAULT_ACCOUNT_GAP.as_secs(),
        )?;

        // Prefer *_FILE for secrets (Docker/K8s friendly), fallback to env var.
        let accounts_file = get("KEEPER_ACCOUNTS_FILE").unwrap_or_else(|| DEFAULT_ACCOUNTS_FILE.to_string());
        let (source, raw) = match fs::read_to_string(&accounts_file) {
            Ok(raw) => (accounts_file, raw),
            Err(_) => match get("KEEPER_ACCOUNTS") {
                Some(raw) => ("KEEPER_ACCOUNTS".to_string(), raw),
                None => bail!(
                    "no accounts configured: {} is not readable and KEEPER_ACCOUNTS is unset",
                    accounts_file
                ),
            },
        };
        let accounts = parse_accounts(&raw).with_context(|| format!("invalid accounts in {}", source))?;

        Ok(Self {
            provider,
            api_base_url,
            reserved_name,
            poll: PollPolicy {
                interval: Duration::from_secs(interval_secs),
                max_checks,
            },
            account_gap: Duration::from_secs(gap_secs),
            accounts,
        })
    }
}

/// Parse a JSON array of `{phone, password}`, keeping its order.
pub fn parse_accounts(raw: &str) -> Result<Vec<Account>> {
    let accounts: Vec<Account> =
        serde_json::from_str(raw).context("expected a JSON array of {\"phone\", \"password\"}")?;
    if accounts.is_empty() {
        bail!("account list is empty");
    }
    if let Some(pos) = accounts.iter().position(|a| a.phone.trim().is_empty()) {
        bail!("account #{} has an empty phone", pos + 1);
    }
    Ok(accounts)
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .parse::<T>()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, v)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TWO_ACCOUNTS: &str =
        r#"[{"phone":"13800000001","password":"a"},{"phone":"13800000002","password":"b"}]"#;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn missing_file() -> String {
        std::env::temp_dir()
            .join(format!("keeper-missing-{}.json", uuid::Uuid::new_v4()))
            .display()
            .to_string()
    }

    #[test]
    fn defaults_with_inline_accounts() {
        let file = missing_file();
        let s = Settings::from_lookup(lookup(&[
            ("KEEPER_ACCOUNTS_FILE", file.as_str()),
            ("KEEPER_ACCOUNTS", TWO_ACCOUNTS),
        ]))
        .unwrap();
        assert_eq!(s.provider, "autodl");
        assert_eq!(s.api_base_url, "https://www.autodl.com");
        assert_eq!(s.reserved_name, "AutoDLKeeper");
        assert_eq!(s.poll.interval, Duration::from_secs(3));
        assert_eq!(s.poll.max_checks, 20);
        assert_eq!(s.account_gap, Duration::from_secs(5));
        assert_eq!(s.accounts.len(), 2);
        assert_eq!(s.accounts[0].phone, "13800000001");
        assert_eq!(s.accounts[1].phone, "13800000002");
    }

    #[test]
    fn overrides_are_applied() {
        let file = missing_file();
        let s = Settings::from_lookup(lookup(&[
            ("KEEPER_ACCOUNTS_FILE", file.as_str()),
            ("KEEPER_ACCOUNTS", TWO_ACCOUNTS),
            ("KEEPER_PROVIDER", " Mock "),
            ("KEEPER_API_BASE_URL", "http://127.0.0.1:9000"),
            ("KEEPER_RESERVED_NAME", "keep-me"),
            ("KEEPER_POLL_INTERVAL_SECS", "1"),
            ("KEEPER_MAX_STATUS_CHECKS", "7"),
            ("KEEPER_ACCOUNT_GAP_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(s.provider, "mock");
        assert_eq!(s.api_base_url, "http://127.0.0.1:9000");
        assert_eq!(s.reserved_name, "keep-me");
        assert_eq!(s.poll.interval, Duration::from_secs(1));
        assert_eq!(s.poll.max_checks, 7);
        assert_eq!(s.account_gap, Duration::ZERO);
    }

    #[test]
    fn accounts_file_wins_over_inline() {
        let path = std::env::temp_dir().join(format!("keeper-accounts-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"[{"phone":"13900000009","password":"f"}]"#).unwrap();
        let file = path.display().to_string();

        let s = Settings::from_lookup(lookup(&[
            ("KEEPER_ACCOUNTS_FILE", file.as_str()),
            ("KEEPER_ACCOUNTS", TWO_ACCOUNTS),
        ]))
        .unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(s.accounts.len(), 1);
        assert_eq!(s.accounts[0].phone, "13900000009");
    }

    #[test]
    fn missing_accounts_is_an_error() {
        let file = missing_file();
        let err = Settings::from_lookup(lookup(&[("KEEPER_ACCOUNTS_FILE", file.as_str())])).unwrap_err();
        assert!(err.to_string().contains("no accounts configured"));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let file = missing_file();
        for (key, value) in [
            ("KEEPER_POLL_INTERVAL_SECS", "three"),
            ("KEEPER_MAX_STATUS_CHECKS", "-1"),
            ("KEEPER_MAX_STATUS_CHECKS", "0"),
            ("KEEPER_ACCOUNT_GAP_SECS", "1.5"),
        ] {
            let res = Settings::from_lookup(lookup(&[
                ("KEEPER_ACCOUNTS_FILE", file.as_str()),
                ("KEEPER_ACCOUNTS", TWO_ACCOUNTS),
                (key, value),
            ]));
            assert!(res.is_err(), "{}={} should be rejected", key, value);
        }
    }

    #[test]
    fn account_list_validation() {
        assert!(parse_accounts("[]").is_err());
        assert!(parse_accounts("{}").is_err());
        assert!(parse_accounts(r#"[{"phone":" ","password":"x"}]"#).is_err());
        assert!(parse_accounts(r#"[{"phone":"1"}]"#).is_err());
        assert_eq!(parse_accounts(TWO_ACCOUNTS).unwrap().len(), 2);
    }
}
