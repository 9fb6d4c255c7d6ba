// Main entry point - Dependency injection and the daily schedule
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::health_gateway::HealthGateway;
use crate::application::notification::NotificationSink;
use crate::application::scheduler_service::SummaryScheduler;
use crate::application::summary_service::SummaryService;
use crate::application::time_source::{SystemClock, TimeSource};
use crate::infrastructure::config::{DEFAULT_CONFIG_PATH, load_config};
use crate::infrastructure::discord::DiscordWebhook;
use crate::infrastructure::garmin::client::GarminClient;
use crate::infrastructure::garmin::registrations::build_pipeline_registries;
use crate::infrastructure::garmin::session::{Credentials, SessionStore};
use crate::presentation::metric_views::build_view_registry;
use crate::presentation::notifier::{ErrorReporter, SummaryNotifier};

const JOB_NAME: &str = "daily-summary";

/// Sends a daily digest of Garmin wellness metrics to Discord
#[derive(Debug, Parser)]
#[command(name = "wellness-digest", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Check today's data once, notify if complete, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Load configuration
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    info!(
        "Tracking {} metrics: {:?}",
        config.metrics.len(),
        config.metrics
    );

    // Create gateway (infrastructure layer)
    let clock: Arc<dyn TimeSource> = Arc::new(SystemClock);
    let store = config.garmin.session_dir.clone().map(SessionStore::new);
    if store.is_none() {
        warn!("No session_dir configured, every start logs in with credentials");
    }
    let gateway = Arc::new(GarminClient::new(
        config.garmin.base_url.clone(),
        config.garmin.token_url.clone(),
        Credentials {
            email: config.garmin.email.clone(),
            password: config.garmin.password.clone(),
        },
        store,
        clock.clone(),
    )?);
    gateway
        .authenticate()
        .await
        .context("Initial Garmin login failed")?;

    // Create services (application layer)
    let registries = build_pipeline_registries(&config.metrics)?;
    let source = Arc::new(SummaryService::new(
        gateway,
        registries,
        config.metrics.clone(),
        config.schedule.window,
    ));

    // Create notification handlers (presentation layer)
    let views = build_view_registry()?;
    views.ensure_covers(&config.metrics)?;
    let sink = Arc::new(DiscordWebhook::new(
        config.discord.webhook_url.clone(),
        config.discord.username.clone(),
    )?);
    let error_sink: Option<Arc<dyn NotificationSink>> = match &config.discord.error_webhook_url {
        Some(url) => Some(Arc::new(DiscordWebhook::new(
            url.clone(),
            config.discord.username.clone(),
        )?)),
        None => {
            warn!("No error_webhook_url configured, errors are only logged");
            None
        }
    };
    let notifier = Arc::new(SummaryNotifier::new(
        views,
        config.discord.message_format,
        sink,
    ));
    let reporter = Arc::new(ErrorReporter::new(error_sink));

    let retry = config.schedule.retry;
    info!(
        "Retrying every {}-{} minutes while data is incomplete",
        retry.min().num_minutes(),
        retry.max().num_minutes()
    );
    let mut scheduler = SummaryScheduler::new(
        source,
        notifier,
        reporter,
        clock,
        config.schedule.time_zone,
        retry,
    );

    if args.once {
        let outcome = scheduler.check_now(JOB_NAME).await;
        info!("Single check finished: {:?}", outcome);
        return Ok(());
    }

    scheduler.add_daily_job(
        config.schedule.notify_time,
        JOB_NAME,
        config.schedule.run_if_missed,
    );
    scheduler.run().await?;

    Ok(())
}
