// Health summary domain model
use super::metric_id::MetricId;
use super::metrics::{
    BodyBatteryMetric, HrvMetric, MetricError, RestingHeartRateMetric, SleepMetric,
    SleepScoreMetric, StressMetric,
};
use chrono::NaiveDate;

/// One metric's series together with its statistics
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedMetric {
    Sleep(SleepMetric),
    SleepScore(SleepScoreMetric),
    RestingHeartRate(RestingHeartRateMetric),
    Hrv(HrvMetric),
    BodyBattery(BodyBatteryMetric),
    Stress(StressMetric),
}

impl DerivedMetric {
    pub fn id(&self) -> MetricId {
        match self {
            DerivedMetric::Sleep(_) => MetricId::Sleep,
            DerivedMetric::SleepScore(_) => MetricId::SleepScore,
            DerivedMetric::RestingHeartRate(_) => MetricId::RestingHeartRate,
            DerivedMetric::Hrv(_) => MetricId::Hrv,
            DerivedMetric::BodyBattery(_) => MetricId::BodyBattery,
            DerivedMetric::Stress(_) => MetricId::Stress,
        }
    }

    pub fn latest_date(&self) -> NaiveDate {
        match self {
            DerivedMetric::Sleep(m) => m.latest_date(),
            DerivedMetric::SleepScore(m) => m.latest_date(),
            DerivedMetric::RestingHeartRate(m) => m.latest_date(),
            DerivedMetric::Hrv(m) => m.latest_date(),
            DerivedMetric::BodyBattery(m) => m.latest_date(),
            DerivedMetric::Stress(m) => m.latest_date(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DerivedMetric::Sleep(m) => m.len(),
            DerivedMetric::SleepScore(m) => m.len(),
            DerivedMetric::RestingHeartRate(m) => m.len(),
            DerivedMetric::Hrv(m) => m.len(),
            DerivedMetric::BodyBattery(m) => m.len(),
            DerivedMetric::Stress(m) => m.len(),
        }
    }

    pub fn is_higher_better(&self) -> bool {
        match self {
            DerivedMetric::Sleep(m) => m.is_higher_better(),
            DerivedMetric::SleepScore(m) => m.is_higher_better(),
            DerivedMetric::RestingHeartRate(m) => m.is_higher_better(),
            DerivedMetric::Hrv(m) => m.is_higher_better(),
            DerivedMetric::BodyBattery(m) => m.is_higher_better(),
            DerivedMetric::Stress(m) => m.is_higher_better(),
        }
    }

    pub fn with_trailing_window(&self, n: usize) -> Result<Self, MetricError> {
        Ok(match self {
            DerivedMetric::Sleep(m) => DerivedMetric::Sleep(m.with_trailing_window(n)?),
            DerivedMetric::SleepScore(m) => DerivedMetric::SleepScore(m.with_trailing_window(n)?),
            DerivedMetric::RestingHeartRate(m) => {
                DerivedMetric::RestingHeartRate(m.with_trailing_window(n)?)
            }
            DerivedMetric::Hrv(m) => DerivedMetric::Hrv(m.with_trailing_window(n)?),
            DerivedMetric::BodyBattery(m) => DerivedMetric::BodyBattery(m.with_trailing_window(n)?),
            DerivedMetric::Stress(m) => DerivedMetric::Stress(m.with_trailing_window(n)?),
        })
    }
}

/// Complete set of metrics for one calendar date, in configured order
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSummary {
    pub date: NaiveDate,
    pub metrics: Vec<DerivedMetric>,
}

impl HealthSummary {
    pub fn new(date: NaiveDate, metrics: Vec<DerivedMetric>) -> Self {
        Self { date, metrics }
    }

    pub fn metric(&self, id: MetricId) -> Option<&DerivedMetric> {
        self.metrics.iter().find(|m| m.id() == id)
    }

    pub fn ids(&self) -> Vec<MetricId> {
        self.metrics.iter().map(DerivedMetric::id).collect()
    }
}
