use std::time::Duration;

use anyhow::Result;
use config::{Config, ConfigBuilder, File, builder::DefaultState};
use serde::Deserialize;

use crate::cli::Cli;

#[derive(Debug, Deserialize)]
pub(crate) struct Settings {
    pub(crate) base_url: String,
    #[serde(default = "default_user_agent")]
    pub(crate) user_agent: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub(crate) request_timeout_seconds: u64,
    /// Current status, uptime summary and clock.
    #[serde(with = "humantime_serde", default = "default_status_interval")]
    pub(crate) status_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_history_interval")]
    pub(crate) history_interval: Duration,
    #[serde(default = "default_use_color")]
    pub(crate) use_color: bool,
    #[serde(default)]
    pub(crate) snapshot_path: Option<String>,
}

fn default_user_agent() -> String {
    format!("uptimeline/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_status_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_history_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_use_color() -> bool {
    true
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.status_interval.is_zero() || self.history_interval.is_zero() {
            anyhow::bail!("status_interval and history_interval must be greater than zero");
        }
        if self.request_timeout_seconds == 0 {
            anyhow::bail!("request_timeout_seconds must be greater than zero");
        }
        Ok(())
    }
}

fn base_builder() -> ConfigBuilder<DefaultState> {
    Config::builder()
        .add_source(File::with_name("config/default.toml").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
}

fn finish(builder: ConfigBuilder<DefaultState>, cli: &Cli) -> Result<Settings> {
    let settings: Settings = builder
        .set_override_option("base_url", cli.base_url.clone())?
        .build()?
        .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

pub(crate) fn load_settings(cli: &Cli) -> Result<Settings> {
    finish(base_builder(), cli)
}
