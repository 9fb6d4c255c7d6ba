// Mapper to convert Garmin DTOs to domain metric models
use crate::domain::metrics::{
    BodyBatteryDay, HrvNight, MetricError, MetricSeries, RestingHeartRateDay, SleepNight,
    SleepScoreDay, StressDay,
};
use crate::domain::summary::DerivedMetric;
use crate::infrastructure::garmin::dtos::{
    BodyBatteryEntryDto, HrvSummaryDto, RestingHeartRateEntryDto, SeriesKind, SleepEntryDto,
    SleepScoreEntryDto, StressEntryDto, TypedSeries,
};
use chrono::TimeDelta;

fn mismatch(expected: SeriesKind, actual: &TypedSeries) -> MetricError {
    MetricError::UnexpectedSeries {
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

// One converter per series kind; any other series is a wiring bug

pub fn convert_sleep(series: TypedSeries) -> Result<DerivedMetric, MetricError> {
    match series {
        TypedSeries::Sleep(entries) => sleep_to_model(entries),
        other => Err(mismatch(SeriesKind::Sleep, &other)),
    }
}

pub fn convert_sleep_score(series: TypedSeries) -> Result<DerivedMetric, MetricError> {
    match series {
        TypedSeries::SleepScore(entries) => sleep_score_to_model(entries),
        other => Err(mismatch(SeriesKind::SleepScore, &other)),
    }
}

pub fn convert_resting_heart_rate(series: TypedSeries) -> Result<DerivedMetric, MetricError> {
    match series {
        TypedSeries::RestingHeartRate(entries) => resting_heart_rate_to_model(entries),
        other => Err(mismatch(SeriesKind::RestingHeartRate, &other)),
    }
}

pub fn convert_hrv(series: TypedSeries) -> Result<DerivedMetric, MetricError> {
    match series {
        TypedSeries::Hrv(response) => hrv_to_model(response.hrv_summaries),
        other => Err(mismatch(SeriesKind::Hrv, &other)),
    }
}

pub fn convert_body_battery(series: TypedSeries) -> Result<DerivedMetric, MetricError> {
    match series {
        TypedSeries::BodyBattery(entries) => body_battery_to_model(entries),
        other => Err(mismatch(SeriesKind::BodyBattery, &other)),
    }
}

pub fn convert_stress(series: TypedSeries) -> Result<DerivedMetric, MetricError> {
    match series {
        TypedSeries::Stress(entries) => stress_to_model(entries),
        other => Err(mismatch(SeriesKind::Stress, &other)),
    }
}

pub fn sleep_to_model(entries: Vec<SleepEntryDto>) -> Result<DerivedMetric, MetricError> {
    let nights = entries.into_iter().map(sleep_night).collect();
    Ok(DerivedMetric::Sleep(MetricSeries::new(nights, true)?))
}

pub fn sleep_score_to_model(
    entries: Vec<SleepScoreEntryDto>,
) -> Result<DerivedMetric, MetricError> {
    let days = entries
        .into_iter()
        .map(|e| SleepScoreDay {
            date: e.calendar_date,
            score: e.value,
        })
        .collect();
    Ok(DerivedMetric::SleepScore(MetricSeries::new(days, true)?))
}

pub fn resting_heart_rate_to_model(
    entries: Vec<RestingHeartRateEntryDto>,
) -> Result<DerivedMetric, MetricError> {
    let days = entries
        .into_iter()
        .map(|e| RestingHeartRateDay {
            date: e.calendar_date,
            bpm: e.values.resting_hr,
        })
        .collect();
    Ok(DerivedMetric::RestingHeartRate(MetricSeries::new(days, false)?))
}

pub fn hrv_to_model(summaries: Vec<HrvSummaryDto>) -> Result<DerivedMetric, MetricError> {
    let nights = summaries
        .into_iter()
        .map(|s| HrvNight {
            date: s.calendar_date,
            // Garmin reports 0 for nights without a reading
            last_night_avg: s.last_night_avg.filter(|v| *v != 0.0),
            weekly_avg: s.weekly_avg,
            status: s.status,
        })
        .collect();
    Ok(DerivedMetric::Hrv(MetricSeries::new(nights, true)?))
}

pub fn body_battery_to_model(
    entries: Vec<BodyBatteryEntryDto>,
) -> Result<DerivedMetric, MetricError> {
    let days = entries
        .into_iter()
        .map(|e| BodyBatteryDay {
            date: e.calendar_date,
            peak: e.peak(),
            charged: e.charged,
            drained: e.drained,
        })
        .collect();
    Ok(DerivedMetric::BodyBattery(MetricSeries::new(days, true)?))
}

pub fn stress_to_model(entries: Vec<StressEntryDto>) -> Result<DerivedMetric, MetricError> {
    let days = entries
        .into_iter()
        .map(|e| StressDay {
            date: e.calendar_date,
            overall_level: e.values.overall_stress_level,
        })
        .collect();
    Ok(DerivedMetric::Stress(MetricSeries::new(days, false)?))
}

fn sleep_night(entry: SleepEntryDto) -> SleepNight {
    let seconds = |s: Option<i64>| TimeDelta::seconds(s.unwrap_or(0));
    SleepNight {
        date: entry.calendar_date,
        total: TimeDelta::seconds(entry.values.total_sleep_seconds),
        deep: seconds(entry.values.deep_sleep_seconds),
        light: seconds(entry.values.light_sleep_seconds),
        rem: seconds(entry.values.rem_sleep_seconds),
        awake: seconds(entry.values.awake_sleep_seconds),
    }
}
