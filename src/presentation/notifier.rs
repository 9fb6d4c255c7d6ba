// Handlers turning summaries and errors into notifications
use crate::application::notification::{
    ExceptionHandler, Notification, NotificationLevel, NotificationSink, SummaryReadyHandler,
};
use crate::domain::summary::HealthSummary;
use crate::presentation::message::{self, MessageFormat};
use crate::presentation::metric_views::ViewRegistry;
use crate::presentation::view_models::SummaryView;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

pub struct SummaryNotifier {
    views: ViewRegistry,
    format: MessageFormat,
    sink: Arc<dyn NotificationSink>,
}

impl SummaryNotifier {
    pub fn new(views: ViewRegistry, format: MessageFormat, sink: Arc<dyn NotificationSink>) -> Self {
        Self { views, format, sink }
    }

    pub fn to_view(&self, summary: &HealthSummary) -> anyhow::Result<SummaryView> {
        let mut metrics = Vec::with_capacity(summary.metrics.len());
        for metric in &summary.metrics {
            let to_view = self.views.resolve(&metric.id())?;
            metrics.push(to_view(metric)?);
        }
        Ok(SummaryView {
            date: summary.date,
            metrics,
        })
    }
}

#[async_trait]
impl SummaryReadyHandler for SummaryNotifier {
    async fn on_summary_ready(&self, summary: HealthSummary) -> anyhow::Result<()> {
        info!("Summary for {} ready, sending notification", summary.date);
        let view = self.to_view(&summary)?;
        let notification = Notification {
            title: message::title(&view),
            body: message::render(&view, self.format),
            level: NotificationLevel::Summary,
        };
        self.sink
            .send(&notification)
            .await
            .context("Failed to send summary notification")
    }
}

/// Logs every error and forwards it to the error sink when one is configured
pub struct ErrorReporter {
    sink: Option<Arc<dyn NotificationSink>>,
}

impl ErrorReporter {
    pub fn new(sink: Option<Arc<dyn NotificationSink>>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl ExceptionHandler for ErrorReporter {
    async fn on_exception(&self, job: &str, error: &anyhow::Error) {
        error!("Job {} raised: {:?}", job, error);
        let Some(sink) = &self.sink else {
            return;
        };
        let notification = Notification {
            title: format!("⚠ Error in {}: {}", job, error),
            body: format!("```{:?}```", error),
            level: NotificationLevel::Error,
        };
        if let Err(e) = sink.send(&notification).await {
            error!("Failed to report error for {}: {:#}", job, e);
        }
    }
}
