// Notification contracts between the scheduler, presentation and sinks
use crate::domain::summary::HealthSummary;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Summary,
    Error,
}

/// Rendered message ready to be delivered
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub level: NotificationLevel,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Called once a complete summary for a day is available
#[async_trait]
pub trait SummaryReadyHandler: Send + Sync {
    async fn on_summary_ready(&self, summary: HealthSummary) -> anyhow::Result<()>;
}

/// Receives every hard error caught at the scheduler's fault boundary
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    async fn on_exception(&self, job: &str, error: &anyhow::Error);
}
