use anyhow::Context;
use keeper_orchestrator::delay::TokioDelay;
use keeper_orchestrator::keepalive_job;
use keeper_orchestrator::provider_manager::ProviderManager;
use keeper_orchestrator::settings::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let settings = Settings::from_env().context("failed to load keeper settings")?;
    info!(
        provider = %settings.provider,
        accounts = settings.accounts.len(),
        reserved_name = %settings.reserved_name,
        "autodl-keeper starting"
    );

    let platform = ProviderManager::get_provider(&settings)?;
    let summary = keepalive_job::run(platform.as_ref(), &TokioDelay, &settings).await;

    info!(
        summary = %serde_json::to_string(&summary).unwrap_or_default(),
        "finished: {} account(s) succeeded, {} failed",
        summary.succeeded,
        summary.failed
    );
    Ok(())
}
