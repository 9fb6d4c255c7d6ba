// Registrations binding metrics, endpoints and series kinds to Garmin behavior
use crate::application::health_gateway::FetchedResponse;
use crate::application::registry::{
    DtoToModel, DtoToModelRegistry, FetcherRegistry, PipelineRegistries, RegistryError,
    ResponseToDto, ResponseToDtoRegistry, fetcher,
};
use crate::domain::metric_id::MetricId;
use crate::infrastructure::garmin::dtos::{
    SeriesKind, parse_body_battery, parse_hrv, parse_resting_heart_rate, parse_sleep,
    parse_sleep_score, parse_stress,
};
use crate::infrastructure::garmin::endpoints::Endpoint;
use crate::infrastructure::garmin::mapper::{
    convert_body_battery, convert_hrv, convert_resting_heart_rate, convert_sleep,
    convert_sleep_score, convert_stress,
};
use tracing::debug;

pub fn endpoint_for(metric: MetricId) -> Endpoint {
    match metric {
        MetricId::Sleep => Endpoint::DailySleep,
        MetricId::SleepScore => Endpoint::DailySleepScore,
        MetricId::RestingHeartRate => Endpoint::DailyRestingHeartRate,
        MetricId::Hrv => Endpoint::DailyHrv,
        MetricId::BodyBattery => Endpoint::DailyBodyBattery,
        MetricId::Stress => Endpoint::DailyStress,
    }
}

fn series_kind_for(endpoint: Endpoint) -> SeriesKind {
    match endpoint {
        Endpoint::DailySleep => SeriesKind::Sleep,
        Endpoint::DailySleepScore => SeriesKind::SleepScore,
        Endpoint::DailyRestingHeartRate => SeriesKind::RestingHeartRate,
        Endpoint::DailyHrv => SeriesKind::Hrv,
        Endpoint::DailyBodyBattery => SeriesKind::BodyBattery,
        Endpoint::DailyStress => SeriesKind::Stress,
    }
}

fn parser_for(endpoint: Endpoint) -> ResponseToDto {
    match endpoint {
        Endpoint::DailySleep => parse_sleep,
        Endpoint::DailySleepScore => parse_sleep_score,
        Endpoint::DailyRestingHeartRate => parse_resting_heart_rate,
        Endpoint::DailyHrv => parse_hrv,
        Endpoint::DailyBodyBattery => parse_body_battery,
        Endpoint::DailyStress => parse_stress,
    }
}

fn converter_for(kind: SeriesKind) -> DtoToModel {
    match kind {
        SeriesKind::Sleep => convert_sleep,
        SeriesKind::SleepScore => convert_sleep_score,
        SeriesKind::RestingHeartRate => convert_resting_heart_rate,
        SeriesKind::Hrv => convert_hrv,
        SeriesKind::BodyBattery => convert_body_battery,
        SeriesKind::Stress => convert_stress,
    }
}

pub fn build_fetcher_registry() -> Result<FetcherRegistry, RegistryError> {
    let mut registry = FetcherRegistry::new("fetcher");
    for metric in MetricId::ALL {
        let endpoint = endpoint_for(metric);
        registry.register(
            metric,
            fetcher(move |period, gateway| {
                Box::pin(async move {
                    debug!("Fetching {} from {} for {:?}", metric, endpoint, period);
                    let data = gateway.fetch(endpoint, &period).await?;
                    Ok(FetchedResponse { data, endpoint })
                })
            }),
        )?;
    }
    Ok(registry)
}

pub fn build_response_registry() -> Result<ResponseToDtoRegistry, RegistryError> {
    let mut registry = ResponseToDtoRegistry::new("response-to-dto");
    for endpoint in Endpoint::ALL {
        registry.register(endpoint, parser_for(endpoint))?;
    }
    Ok(registry)
}

pub fn build_model_registry() -> Result<DtoToModelRegistry, RegistryError> {
    let mut registry = DtoToModelRegistry::new("dto-to-model");
    for endpoint in Endpoint::ALL {
        let kind = series_kind_for(endpoint);
        registry.register(kind, converter_for(kind))?;
    }
    Ok(registry)
}

/// Builds all three pipeline registries and checks they cover the configured metrics
pub fn build_pipeline_registries(
    metrics: &[MetricId],
) -> Result<PipelineRegistries, RegistryError> {
    let fetchers = build_fetcher_registry()?;
    let to_dto = build_response_registry()?;
    let to_model = build_model_registry()?;

    fetchers.ensure_covers(metrics)?;
    let endpoints: Vec<Endpoint> = metrics.iter().map(|m| endpoint_for(*m)).collect();
    to_dto.ensure_covers(&endpoints)?;
    let kinds: Vec<SeriesKind> = endpoints.iter().map(|e| series_kind_for(*e)).collect();
    to_model.ensure_covers(&kinds)?;

    Ok(PipelineRegistries {
        fetchers,
        to_dto,
        to_model,
    })
}
