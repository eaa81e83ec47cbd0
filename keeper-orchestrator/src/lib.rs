pub mod authenticator;
pub mod cycler;
pub mod delay;
pub mod keepalive_job;
pub mod logger;
pub mod models;
pub mod provider_manager;
pub mod settings;
pub mod state_machine;
