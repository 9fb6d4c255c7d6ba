// Derived metric models - dated series with computed statistics
use chrono::{NaiveDate, TimeDelta};
use std::cmp::Ordering;
use thiserror::Error;

pub const DAYS_IN_WEEK: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    #[error("Cannot build a metric from an empty series")]
    EmptySeries,

    #[error("Expected a {expected} series, got {actual}")]
    UnexpectedSeries { expected: String, actual: String },
}

/// Value produced by a metric's selector.
///
/// Implementations keep their own type through every statistic, so a
/// duration metric averages to a duration and yields duration deltas.
pub trait MetricValue: Copy {
    /// Mean of the given values. Callers never pass an empty sequence for
    /// plain values; absent-capable values may average to absent.
    fn mean(values: Vec<Self>) -> Self;

    fn delta(self, other: Self) -> Self;

    /// Sign relative to zero, `None` when undetermined
    fn sign(self) -> Option<Ordering>;
}

impl MetricValue for f64 {
    fn mean(values: Vec<Self>) -> Self {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn delta(self, other: Self) -> Self {
        self - other
    }

    fn sign(self) -> Option<Ordering> {
        self.partial_cmp(&0.0)
    }
}

impl MetricValue for TimeDelta {
    fn mean(values: Vec<Self>) -> Self {
        if values.is_empty() {
            return TimeDelta::zero();
        }
        let total_ms: i64 = values.iter().map(|v| v.num_milliseconds()).sum();
        TimeDelta::milliseconds(total_ms / values.len() as i64)
    }

    fn delta(self, other: Self) -> Self {
        self - other
    }

    fn sign(self) -> Option<Ordering> {
        Some(self.cmp(&TimeDelta::zero()))
    }
}

// Absent values are skipped when averaging and poison any delta they take part in.
impl<T: MetricValue> MetricValue for Option<T> {
    fn mean(values: Vec<Self>) -> Self {
        let present: Vec<T> = values.into_iter().flatten().collect();
        if present.is_empty() {
            None
        } else {
            Some(T::mean(present))
        }
    }

    fn delta(self, other: Self) -> Self {
        self.zip(other).map(|(a, b)| a.delta(b))
    }

    fn sign(self) -> Option<Ordering> {
        self.and_then(MetricValue::sign)
    }
}

/// An entry of a daily series
pub trait MetricEntry: Clone {
    type Value: MetricValue;

    fn date(&self) -> NaiveDate;

    /// Metric-specific value selector
    fn value(&self) -> Self::Value;
}

/// How a delta reads given the metric's polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Favorable,
    Unfavorable,
    Neutral,
    Unknown,
}

impl Trend {
    pub fn classify<V: MetricValue>(delta: V, higher_is_better: bool) -> Self {
        match delta.sign() {
            None => Trend::Unknown,
            Some(Ordering::Equal) => Trend::Neutral,
            Some(Ordering::Greater) if higher_is_better => Trend::Favorable,
            Some(Ordering::Less) if !higher_is_better => Trend::Favorable,
            Some(_) => Trend::Unfavorable,
        }
    }
}

/// Time series of one metric, sorted ascending by date, never empty
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries<E> {
    entries: Vec<E>,
    higher_is_better: bool,
}

impl<E: MetricEntry> MetricSeries<E> {
    pub fn new(mut entries: Vec<E>, higher_is_better: bool) -> Result<Self, MetricError> {
        if entries.is_empty() {
            return Err(MetricError::EmptySeries);
        }
        // Gateway order is not guaranteed
        entries.sort_by_key(|e| e.date());
        Ok(Self {
            entries,
            higher_is_better,
        })
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn latest_entry(&self) -> &E {
        // Non-empty by construction
        &self.entries[self.entries.len() - 1]
    }

    pub fn latest_date(&self) -> NaiveDate {
        self.latest_entry().date()
    }

    pub fn latest(&self) -> E::Value {
        self.latest_entry().value()
    }

    pub fn values(&self) -> Vec<E::Value> {
        self.entries.iter().map(MetricEntry::value).collect()
    }

    pub fn average(&self) -> E::Value {
        E::Value::mean(self.values())
    }

    /// Mean over the last `n` entries, or over all of them if the series is shorter
    pub fn trailing_average(&self, n: usize) -> E::Value {
        E::Value::mean(self.tail(n).iter().map(MetricEntry::value).collect())
    }

    pub fn weekly_average(&self) -> E::Value {
        self.trailing_average(DAYS_IN_WEEK)
    }

    pub fn delta_to_average(&self) -> E::Value {
        self.latest().delta(self.average())
    }

    pub fn delta_to_trailing_average(&self, n: usize) -> E::Value {
        self.latest().delta(self.trailing_average(n))
    }

    pub fn delta_to_target(&self, target: E::Value) -> E::Value {
        self.latest().delta(target)
    }

    pub fn is_higher_better(&self) -> bool {
        self.higher_is_better
    }

    pub fn trend(&self, delta: E::Value) -> Trend {
        Trend::classify(delta, self.higher_is_better)
    }

    /// Independent copy restricted to the last `n` entries
    pub fn with_trailing_window(&self, n: usize) -> Result<Self, MetricError> {
        if n == 0 {
            return Err(MetricError::EmptySeries);
        }
        Ok(Self {
            entries: self.tail(n).to_vec(),
            higher_is_better: self.higher_is_better,
        })
    }

    fn tail(&self, n: usize) -> &[E] {
        let skip = self.entries.len().saturating_sub(n);
        &self.entries[skip..]
    }
}

// NB: Entries may have gaps in dates, e.g. nights the device was not worn.

#[derive(Debug, Clone, PartialEq)]
pub struct SleepNight {
    pub date: NaiveDate,
    pub total: TimeDelta,
    pub deep: TimeDelta,
    pub light: TimeDelta,
    pub rem: TimeDelta,
    pub awake: TimeDelta,
}

impl MetricEntry for SleepNight {
    type Value = TimeDelta;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn value(&self) -> TimeDelta {
        self.total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SleepScoreDay {
    pub date: NaiveDate,
    pub score: f64,
}

impl MetricEntry for SleepScoreDay {
    type Value = f64;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn value(&self) -> f64 {
        self.score
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestingHeartRateDay {
    pub date: NaiveDate,
    pub bpm: f64,
}

impl MetricEntry for RestingHeartRateDay {
    type Value = f64;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn value(&self) -> f64 {
        self.bpm
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HrvNight {
    pub date: NaiveDate,
    /// Absent when no HRV was recorded that night
    pub last_night_avg: Option<f64>,
    pub weekly_avg: Option<f64>,
    pub status: String,
}

impl MetricEntry for HrvNight {
    type Value = Option<f64>;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn value(&self) -> Option<f64> {
        self.last_night_avg
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyBatteryDay {
    pub date: NaiveDate,
    /// Highest level of the day, absent before the first sync
    pub peak: Option<f64>,
    pub charged: Option<f64>,
    pub drained: Option<f64>,
}

impl MetricEntry for BodyBatteryDay {
    type Value = Option<f64>;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn value(&self) -> Option<f64> {
        self.peak
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StressDay {
    pub date: NaiveDate,
    pub overall_level: f64,
}

impl MetricEntry for StressDay {
    type Value = f64;

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn value(&self) -> f64 {
        self.overall_level
    }
}

pub type SleepMetric = MetricSeries<SleepNight>;
pub type SleepScoreMetric = MetricSeries<SleepScoreDay>;
pub type RestingHeartRateMetric = MetricSeries<RestingHeartRateDay>;
pub type HrvMetric = MetricSeries<HrvNight>;
pub type BodyBatteryMetric = MetricSeries<BodyBatteryDay>;
pub type StressMetric = MetricSeries<StressDay>;

impl MetricSeries<SleepNight> {
    pub fn total(&self) -> TimeDelta {
        self.entries.iter().map(|e| e.total).sum()
    }
}

impl MetricSeries<HrvNight> {
    /// Weekly average as last reported by the device
    pub fn reported_weekly_average(&self) -> Option<f64> {
        self.latest_entry().weekly_avg
    }

    /// Latest night against the device's weekly figure, absent if either is missing
    pub fn delta_to_reported_weekly_average(&self) -> Option<f64> {
        self.latest()
            .zip(self.reported_weekly_average())
            .map(|(latest, weekly)| latest - weekly)
    }

    pub fn is_balanced(&self) -> bool {
        self.latest_entry().status.eq_ignore_ascii_case("BALANCED")
    }
}
