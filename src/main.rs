mod api;
mod cli;
mod config;
mod dashboard;
mod error;
mod models;
mod render;
mod snapshot;
mod timeline;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::StatusApi;
use crate::cli::Cli;
use crate::config::load_settings;
use crate::dashboard::RenderOptions;

const DEFAULT_LOG_FILTER: &str = "uptimeline=info";

/// `RUST_LOG` wins when set; otherwise log this crate at info.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stderr keeps diagnostics out of the dashboard drawn on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    if cli.no_color || !settings.use_color {
        colored::control::set_override(false);
    }

    let client = Client::builder()
        .user_agent(&settings.user_agent)
        .timeout(Duration::from_secs(settings.request_timeout_seconds))
        .build()?;
    let api = StatusApi::new(client, &settings.base_url)?;

    let options = RenderOptions {
        verbose: cli.verbose,
        snapshot_path: settings.snapshot_path.clone(),
    };

    if cli.once {
        return dashboard::run_once(&api, &options).await;
    }

    tracing::info!("Starting uptimeline with User-Agent: {}", settings.user_agent);
    dashboard::run(&settings, api, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_overrides_default_filter() {
        let filter = log_filter(Some("uptimeline=debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_default_filter_when_rust_log_unset() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    }
}
