use crate::application::scheduler_service::{RetryPolicy, SchedulerError};
use crate::domain::metric_id::{MetricId, dedup_preserving_order};
use crate::domain::period::WindowLength;
use crate::infrastructure::garmin::session::Password;
use crate::presentation::message::MessageFormat;
use chrono::NaiveTime;
use chrono_tz::Tz;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
const ENV_PREFIX: &str = "DIGEST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid notify_time '{0}', expected HH:MM or HH:MM:SS")]
    NotifyTime(String),

    #[error("Unknown time zone '{0}'")]
    TimeZone(String),

    #[error("At least one metric must be configured")]
    NoMetrics,

    #[error(transparent)]
    Retry(#[from] SchedulerError),
}

// Raw shape of the file and environment before validation

#[derive(Debug, Deserialize, Clone)]
struct RawConfig {
    garmin: GarminSettings,
    schedule: RawSchedule,
    #[serde(default = "default_metrics")]
    metrics: Vec<MetricId>,
    discord: DiscordSettings,
}

#[derive(Debug, Deserialize, Clone)]
struct RawSchedule {
    notify_time: String,
    #[serde(default = "default_time_zone")]
    time_zone: String,
    #[serde(default = "default_retry_min")]
    retry_min_minutes: i64,
    #[serde(default = "default_retry_max")]
    retry_max_minutes: i64,
    #[serde(default = "default_true")]
    run_if_missed: bool,
    #[serde(default)]
    window: WindowLength,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GarminSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    pub email: String,
    /// Optional when a saved session exists
    #[serde(default)]
    pub password: Option<Password>,
    #[serde(default)]
    pub session_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordSettings {
    pub webhook_url: String,
    #[serde(default)]
    pub error_webhook_url: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub message_format: MessageFormat,
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub notify_time: NaiveTime,
    pub time_zone: Tz,
    pub retry: RetryPolicy,
    pub run_if_missed: bool,
    pub window: WindowLength,
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub garmin: GarminSettings,
    pub schedule: ScheduleSettings,
    pub metrics: Vec<MetricId>,
    pub discord: DiscordSettings,
}

fn default_metrics() -> Vec<MetricId> {
    MetricId::ALL.to_vec()
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_retry_min() -> i64 {
    30
}

fn default_retry_max() -> i64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://connectapi.garmin.com".to_string()
}

fn default_token_url() -> String {
    "https://connectapi.garmin.com/oauth-service/oauth/exchange/user/2.0".to_string()
}

fn default_username() -> String {
    "garmin-connect-bot".to_string()
}

fn parse_notify_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ConfigError::NotifyTime(value.to_string()))
}

impl TryFrom<RawConfig> for DigestConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let metrics = dedup_preserving_order(&raw.metrics);
        if metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }

        let time_zone: Tz = raw
            .schedule
            .time_zone
            .parse()
            .map_err(|_| ConfigError::TimeZone(raw.schedule.time_zone.clone()))?;

        let schedule = ScheduleSettings {
            notify_time: parse_notify_time(&raw.schedule.notify_time)?,
            time_zone,
            retry: RetryPolicy::from_minutes(
                raw.schedule.retry_min_minutes,
                raw.schedule.retry_max_minutes,
            )?,
            run_if_missed: raw.schedule.run_if_missed,
            window: raw.schedule.window,
        };

        Ok(Self {
            garmin: raw.garmin,
            schedule,
            metrics,
            discord: raw.discord,
        })
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("metrics")
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<DigestConfig, ConfigError> {
    let settings = builder.add_source(environment()).build()?;
    let raw: RawConfig = settings.try_deserialize()?;
    raw.try_into()
}

/// Loads the TOML file at `path`, with `DIGEST_*` environment variables on top
pub fn load_config(path: &str) -> Result<DigestConfig, ConfigError> {
    finish(config::Config::builder().add_source(File::with_name(path)))
}

#[cfg(test)]
fn parse_config(toml: &str) -> Result<DigestConfig, ConfigError> {
    finish(config::Config::builder().add_source(File::from_str(toml, config::FileFormat::Toml)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [garmin]
        email = "me@example.com"

        [schedule]
        notify_time = "07:30"
        time_zone = "Europe/Oslo"

        [discord]
        webhook_url = "https://discord.invalid/api/webhooks/1/abc"
    "#;

    #[test]
    fn test_defaults() {
        let config = parse_config(MINIMAL).unwrap();

        assert_eq!(config.metrics, MetricId::ALL.to_vec());
        assert_eq!(
            config.schedule.notify_time,
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(config.schedule.time_zone, chrono_tz::Europe::Oslo);
        assert_eq!(config.schedule.retry, RetryPolicy::from_minutes(30, 60).unwrap());
        assert!(config.schedule.run_if_missed);
        assert_eq!(config.schedule.window, WindowLength::FourWeeks);
        assert_eq!(config.discord.message_format, MessageFormat::Table);
        assert_eq!(config.discord.username, "garmin-connect-bot");
        assert!(config.garmin.password.is_none());
    }

    #[test]
    fn test_metrics_are_deduplicated_in_order() {
        let toml = format!("metrics = [\"hrv\", \"sleep\", \"hrv\", \"rhr\"]\n{}", MINIMAL);
        let config = parse_config(&toml).unwrap();
        assert_eq!(
            config.metrics,
            vec![MetricId::Hrv, MetricId::Sleep, MetricId::RestingHeartRate]
        );
    }

    #[test]
    fn test_empty_metrics_rejected() {
        let toml = format!("metrics = []\n{}", MINIMAL);
        assert!(matches!(parse_config(&toml), Err(ConfigError::NoMetrics)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_time = MINIMAL.replace("07:30", "7.30am");
        assert!(matches!(
            parse_config(&bad_time),
            Err(ConfigError::NotifyTime(_))
        ));

        let bad_zone = MINIMAL.replace("Europe/Oslo", "Mars/Olympus");
        assert!(matches!(
            parse_config(&bad_zone),
            Err(ConfigError::TimeZone(_))
        ));

        let bad_retry = MINIMAL.replace(
            "time_zone = \"Europe/Oslo\"",
            "time_zone = \"UTC\"\nretry_min_minutes = 90",
        );
        assert!(matches!(parse_config(&bad_retry), Err(ConfigError::Retry(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.toml");
        let content = MINIMAL.replace(
            "[discord]",
            "[discord]\nmessage_format = \"lines\"\nerror_webhook_url = \"https://discord.invalid/err\"",
        );
        std::fs::write(&path, content).unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.discord.message_format, MessageFormat::Lines);
        assert_eq!(
            config.discord.error_webhook_url.as_deref(),
            Some("https://discord.invalid/err")
        );
    }
}
