// View models for the daily summary message
use crate::domain::metrics::Trend;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaToTarget {
    pub target_name: String,
    pub delta: String,
}

/// One metric, fully formatted for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricView {
    pub name: String,
    pub icon: String,
    pub latest: String,
    pub delta_to_average: String,
    pub trend: Trend,
    pub weekly_average: String,
    /// Scale maximum shown as a `/max` suffix, e.g. scores out of 100
    pub out_of_max: Option<u32>,
    pub delta_to_target: Option<DeltaToTarget>,
}

impl MetricView {
    pub fn out_of_max_suffix(&self) -> String {
        self.out_of_max.map(|m| format!("/{}", m)).unwrap_or_default()
    }

    pub fn trend_marker(&self) -> &'static str {
        match self.trend {
            Trend::Favorable => "🟢",
            Trend::Unfavorable => "🔴",
            Trend::Neutral => "⚪",
            Trend::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    pub date: NaiveDate,
    pub metrics: Vec<MetricView>,
}
