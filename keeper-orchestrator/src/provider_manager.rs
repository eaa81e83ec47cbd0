use anyhow::{bail, Result};
use keeper_providers::RentalPlatform;

use crate::settings::Settings;

pub struct ProviderManager;

impl ProviderManager {
    /// Build the platform named by `settings.provider`.
    pub fn get_provider(settings: &Settings) -> Result<Box<dyn RentalPlatform>> {
        match settings.provider.as_str() {
            #[cfg(feature = "provider-autodl")]
            "autodl" => {
                let platform =
                    keeper_providers::autodl::AutoDlPlatform::new(&settings.api_base_url)?;
                Ok(Box::new(platform))
            }
            #[cfg(feature = "provider-mock")]
            "mock" => Ok(Box::new(keeper_providers::mock::MockPlatform::demo(
                &settings.accounts,
            ))),
            other => bail!(
                "provider '{}' is unknown or not compiled in (features: provider-autodl, provider-mock)",
                other
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_common::Account;

    #[test]
    fn unknown_provider_is_rejected() {
        let mut settings = Settings::with_accounts(vec![Account::new("13800000001", "pw")]);
        settings.provider = "ovh".to_string();
        let err = ProviderManager::get_provider(&settings).err().unwrap();
        assert!(err.to_string().contains("ovh"));
    }

    #[cfg(feature = "provider-mock")]
    #[tokio::test]
    async fn mock_provider_runs_a_dry_run() {
        use crate::delay::RecordingDelay;
        use crate::keepalive_job;

        let mut settings = Settings::with_accounts(vec![
            Account::new("13800000001", "a"),
            Account::new("13800000002", "b"),
        ]);
        settings.provider = "mock".to_string();
        let platform = ProviderManager::get_provider(&settings).unwrap();

        let summary = keepalive_job::run(platform.as_ref(), &RecordingDelay::new(), &settings).await;
        assert_eq!((summary.succeeded, summary.failed), (2, 0));
        assert!(summary.reports.iter().all(|r| r.excluded == 1 && r.count("shutdown") == 1));
    }

    #[cfg(feature = "provider-autodl")]
    #[test]
    fn autodl_provider_builds() {
        let settings = Settings::with_accounts(vec![Account::new("13800000001", "pw")]);
        assert!(ProviderManager::get_provider(&settings).is_ok());
    }
}
