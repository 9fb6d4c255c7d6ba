// Summary service - Fetch, validate and convert every configured metric for one day
use crate::application::health_gateway::{GatewayError, HealthGateway, is_empty_payload};
use crate::application::registry::{PipelineRegistries, RegistryError};
use crate::domain::metric_id::MetricId;
use crate::domain::metrics::MetricError;
use crate::domain::period::{PeriodError, WindowLength};
use crate::domain::summary::HealthSummary;
use crate::infrastructure::garmin::dtos::SchemaValidationError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Hard failures of a pipeline run. "Not ready" is never one of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    #[error(transparent)]
    Metric(#[from] MetricError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The service returned nothing for the window
    NoData,
    /// Data exists but not for this date yet
    MissingDate(NaiveDate),
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::NoData => f.write_str("no data returned"),
            NotReadyReason::MissingDate(date) => write!(f, "no entry dated {}", date),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Ready(HealthSummary),
    NotReady {
        metric: MetricId,
        reason: NotReadyReason,
    },
}

#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn try_get_summary(&self, date: NaiveDate) -> Result<SummaryOutcome, PipelineError>;
}

pub struct SummaryService {
    gateway: Arc<dyn HealthGateway>,
    registries: PipelineRegistries,
    metrics: Vec<MetricId>,
    window: WindowLength,
}

impl SummaryService {
    pub fn new(
        gateway: Arc<dyn HealthGateway>,
        registries: PipelineRegistries,
        metrics: Vec<MetricId>,
        window: WindowLength,
    ) -> Self {
        Self {
            gateway,
            registries,
            metrics,
            window,
        }
    }
}

#[async_trait]
impl SummarySource for SummaryService {
    async fn try_get_summary(&self, date: NaiveDate) -> Result<SummaryOutcome, PipelineError> {
        let period = self.window.ending_on(date)?;
        info!(
            "Checking {} metrics for {} ({} to {})",
            self.metrics.len(),
            date,
            period.start(),
            period.end()
        );

        // Sequential on purpose: the first missing metric ends the run
        let mut collected = Vec::with_capacity(self.metrics.len());
        for &metric in &self.metrics {
            let fetch = self.registries.fetchers.resolve(&metric)?;
            let response = fetch(period, self.gateway.as_ref()).await?;

            let Some(data) = response.data.filter(|d| !is_empty_payload(d)) else {
                info!("{} not ready for {}: no data returned", metric, date);
                return Ok(SummaryOutcome::NotReady {
                    metric,
                    reason: NotReadyReason::NoData,
                });
            };

            let parse = self.registries.to_dto.resolve(&response.endpoint)?;
            let series = parse(&data)?;
            if !series.has_entry_on(period.end()) {
                info!(
                    "{} not ready for {}: latest entry {:?}",
                    metric,
                    date,
                    series.dates().last()
                );
                return Ok(SummaryOutcome::NotReady {
                    metric,
                    reason: NotReadyReason::MissingDate(period.end()),
                });
            }
            debug!("{} has {} entries", metric, series.len());
            collected.push(series);
        }

        let mut models = Vec::with_capacity(collected.len());
        for series in collected {
            let convert = self.registries.to_model.resolve(&series.kind())?;
            models.push(convert(series)?);
        }

        info!("Summary for {} is complete", date);
        Ok(SummaryOutcome::Ready(HealthSummary::new(period.end(), models)))
    }
}
