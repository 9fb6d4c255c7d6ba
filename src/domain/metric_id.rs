// Tracked wellness metric identifiers
use serde::Deserialize;
use std::fmt;

/// One tracked wellness measurement.
///
/// The configured order decides both fetch order and display order. Metrics
/// recorded during sleep come first in the canonical order since they are the
/// ones most likely to be missing early in the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Sleep,
    SleepScore,
    #[serde(alias = "rhr")]
    RestingHeartRate,
    Hrv,
    #[serde(alias = "bb")]
    BodyBattery,
    Stress,
}

impl MetricId {
    pub const ALL: [MetricId; 6] = [
        MetricId::Sleep,
        MetricId::SleepScore,
        MetricId::RestingHeartRate,
        MetricId::Hrv,
        MetricId::BodyBattery,
        MetricId::Stress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricId::Sleep => "sleep",
            MetricId::SleepScore => "sleep_score",
            MetricId::RestingHeartRate => "resting_heart_rate",
            MetricId::Hrv => "hrv",
            MetricId::BodyBattery => "body_battery",
            MetricId::Stress => "stress",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Removes repeated ids, keeping the first occurrence of each
pub fn dedup_preserving_order(ids: &[MetricId]) -> Vec<MetricId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}
