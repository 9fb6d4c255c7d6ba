// Model-to-presentation conversions, one per metric
use crate::application::registry::{Registry, RegistryError};
use crate::domain::metric_id::MetricId;
use crate::domain::metrics::{DAYS_IN_WEEK, MetricEntry, MetricSeries};
use crate::domain::summary::DerivedMetric;
use crate::presentation::view_models::{DeltaToTarget, MetricView};
use chrono::TimeDelta;
use thiserror::Error;

const SLEEP_TARGET_HOURS: i64 = 8;
const SCORE_MAX: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresentationError {
    #[error("{expected} view cannot present a {actual} model")]
    UnexpectedModel { expected: MetricId, actual: MetricId },
}

pub type ToView = fn(&DerivedMetric) -> Result<MetricView, PresentationError>;
pub type ViewRegistry = Registry<MetricId, ToView>;

pub fn build_view_registry() -> Result<ViewRegistry, RegistryError> {
    let mut registry = ViewRegistry::new("model-to-presentation");
    for id in MetricId::ALL {
        registry.register(id, view_for(id))?;
    }
    Ok(registry)
}

fn view_for(id: MetricId) -> ToView {
    match id {
        MetricId::Sleep => sleep_view,
        MetricId::SleepScore => sleep_score_view,
        MetricId::RestingHeartRate => resting_heart_rate_view,
        MetricId::Hrv => hrv_view,
        MetricId::BodyBattery => body_battery_view,
        MetricId::Stress => stress_view,
    }
}

fn unexpected(expected: MetricId, model: &DerivedMetric) -> PresentationError {
    PresentationError::UnexpectedModel {
        expected,
        actual: model.id(),
    }
}

fn sleep_view(model: &DerivedMetric) -> Result<MetricView, PresentationError> {
    let DerivedMetric::Sleep(series) = model else {
        return Err(unexpected(MetricId::Sleep, model));
    };
    let delta = series.delta_to_trailing_average(DAYS_IN_WEEK);
    let to_target = series.delta_to_target(TimeDelta::hours(SLEEP_TARGET_HOURS));

    Ok(MetricView {
        name: "Sleep".to_string(),
        icon: "💤".to_string(),
        latest: format_duration(series.latest(), false),
        delta_to_average: format_duration(delta, true),
        trend: series.trend(round_to_minutes(delta)),
        weekly_average: format_duration(series.weekly_average(), false),
        out_of_max: None,
        delta_to_target: Some(DeltaToTarget {
            target_name: format!("{}h", SLEEP_TARGET_HOURS),
            delta: format_duration(to_target, true),
        }),
    })
}

fn sleep_score_view(model: &DerivedMetric) -> Result<MetricView, PresentationError> {
    match model {
        DerivedMetric::SleepScore(series) => {
            Ok(number_view("Sleep Score", "😴", series, Some(SCORE_MAX)))
        }
        _ => Err(unexpected(MetricId::SleepScore, model)),
    }
}

fn resting_heart_rate_view(model: &DerivedMetric) -> Result<MetricView, PresentationError> {
    match model {
        // The plain heart emoji breaks table alignment
        DerivedMetric::RestingHeartRate(series) => {
            Ok(number_view("Resting HR", "💗", series, None))
        }
        _ => Err(unexpected(MetricId::RestingHeartRate, model)),
    }
}

fn hrv_view(model: &DerivedMetric) -> Result<MetricView, PresentationError> {
    let DerivedMetric::Hrv(series) = model else {
        return Err(unexpected(MetricId::Hrv, model));
    };
    let mut view = optional_view("HRV", "💓", series, None);
    // Prefer the device's own weekly figure, and compare against it
    if let Some(reported) = series.reported_weekly_average() {
        let delta = series.delta_to_reported_weekly_average().map(f64::round);
        view.weekly_average = format_number(reported);
        view.delta_to_average = delta.map(format_signed).unwrap_or_else(|| "N/A".to_string());
        view.trend = series.trend(delta);
    }
    Ok(view)
}

fn body_battery_view(model: &DerivedMetric) -> Result<MetricView, PresentationError> {
    match model {
        DerivedMetric::BodyBattery(series) => Ok(optional_view(
            "Body Battery",
            "⚡",
            series,
            Some(SCORE_MAX),
        )),
        _ => Err(unexpected(MetricId::BodyBattery, model)),
    }
}

fn stress_view(model: &DerivedMetric) -> Result<MetricView, PresentationError> {
    match model {
        DerivedMetric::Stress(series) => {
            Ok(number_view("Stress Level", "🤯", series, Some(SCORE_MAX)))
        }
        _ => Err(unexpected(MetricId::Stress, model)),
    }
}

fn number_view<E>(
    name: &str,
    icon: &str,
    series: &MetricSeries<E>,
    out_of_max: Option<u32>,
) -> MetricView
where
    E: MetricEntry<Value = f64>,
{
    let delta = series.delta_to_trailing_average(DAYS_IN_WEEK).round();
    MetricView {
        name: name.to_string(),
        icon: icon.to_string(),
        latest: format_number(series.latest()),
        delta_to_average: format_signed(delta),
        trend: series.trend(delta),
        weekly_average: format_number(series.weekly_average()),
        out_of_max,
        delta_to_target: None,
    }
}

fn optional_view<E>(
    name: &str,
    icon: &str,
    series: &MetricSeries<E>,
    out_of_max: Option<u32>,
) -> MetricView
where
    E: MetricEntry<Value = Option<f64>>,
{
    let delta = series.delta_to_trailing_average(DAYS_IN_WEEK).map(f64::round);
    MetricView {
        name: name.to_string(),
        icon: icon.to_string(),
        latest: format_optional(series.latest()),
        delta_to_average: delta.map(format_signed).unwrap_or_else(|| "N/A".to_string()),
        trend: series.trend(delta),
        weekly_average: format_optional(series.weekly_average()),
        out_of_max,
        delta_to_target: None,
    }
}

fn round_to_minutes(delta: TimeDelta) -> TimeDelta {
    TimeDelta::minutes(delta.num_minutes())
}

pub fn format_number(value: f64) -> String {
    format!("{:.0}", value)
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "N/A".to_string())
}

/// Rounded, with an explicit sign unless zero
pub fn format_signed(value: f64) -> String {
    let rounded = value.round();
    if rounded > 0.0 {
        format!("+{:.0}", rounded)
    } else if rounded < 0.0 {
        format!("-{:.0}", rounded.abs())
    } else {
        "0".to_string()
    }
}

/// `7h30m`, or `45m` under an hour
pub fn format_duration(delta: TimeDelta, signed: bool) -> String {
    let total_minutes = delta.num_minutes();
    let hours = total_minutes.abs() / 60;
    let minutes = total_minutes.abs() % 60;
    let sign = match (signed, total_minutes.signum()) {
        (true, 1) => "+",
        (true, -1) => "-",
        _ => "",
    };
    if hours == 0 {
        format!("{}{}m", sign, minutes)
    } else {
        format!("{}{}h{}m", sign, hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::{HrvNight, SleepNight, StressDay, Trend};
    use chrono::NaiveDate;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
    }

    fn sleep(n: u32, minutes: i64) -> SleepNight {
        SleepNight {
            date: day(n),
            total: TimeDelta::minutes(minutes),
            deep: TimeDelta::zero(),
            light: TimeDelta::zero(),
            rem: TimeDelta::zero(),
            awake: TimeDelta::zero(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::minutes(450), false), "7h30m");
        assert_eq!(format_duration(TimeDelta::minutes(45), false), "45m");
        assert_eq!(format_duration(TimeDelta::minutes(-75), true), "-1h15m");
        assert_eq!(format_duration(TimeDelta::minutes(20), true), "+20m");
        assert_eq!(format_duration(TimeDelta::zero(), true), "0m");
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed(4.6), "+5");
        assert_eq!(format_signed(-3.2), "-3");
        assert_eq!(format_signed(0.2), "0");
    }

    #[test]
    fn test_sleep_view_includes_target() {
        let series = MetricSeries::new(vec![sleep(1, 420), sleep(2, 480)], true).unwrap();
        let view = sleep_view(&DerivedMetric::Sleep(series)).unwrap();

        assert_eq!(view.latest, "8h0m");
        assert_eq!(view.weekly_average, "7h30m");
        assert_eq!(view.delta_to_average, "+30m");
        assert_eq!(view.trend, Trend::Favorable);
        assert_eq!(
            view.delta_to_target,
            Some(DeltaToTarget {
                target_name: "8h".to_string(),
                delta: "0m".to_string(),
            })
        );
    }

    #[test]
    fn test_stress_view_lower_is_better() {
        let series = MetricSeries::new(
            vec![
                StressDay { date: day(1), overall_level: 40.0 },
                StressDay { date: day(2), overall_level: 30.0 },
            ],
            false,
        )
        .unwrap();
        let view = stress_view(&DerivedMetric::Stress(series)).unwrap();

        assert_eq!(view.latest, "30");
        assert_eq!(view.delta_to_average, "-5");
        assert_eq!(view.trend, Trend::Favorable);
        assert_eq!(view.out_of_max_suffix(), "/100");
    }

    #[test]
    fn test_hrv_view_without_last_night() {
        let series = MetricSeries::new(
            vec![
                HrvNight {
                    date: day(1),
                    last_night_avg: Some(60.0),
                    weekly_avg: Some(58.0),
                    status: "BALANCED".to_string(),
                },
                HrvNight {
                    date: day(2),
                    last_night_avg: None,
                    weekly_avg: Some(59.0),
                    status: "BALANCED".to_string(),
                },
            ],
            true,
        )
        .unwrap();
        let view = hrv_view(&DerivedMetric::Hrv(series)).unwrap();

        assert_eq!(view.latest, "N/A");
        assert_eq!(view.delta_to_average, "N/A");
        assert_eq!(view.trend, Trend::Unknown);
        assert_eq!(view.weekly_average, "59");
    }

    #[test]
    fn test_hrv_delta_uses_reported_weekly_average() {
        let series = MetricSeries::new(
            vec![
                HrvNight {
                    date: day(1),
                    last_night_avg: Some(40.0),
                    weekly_avg: Some(60.0),
                    status: "BALANCED".to_string(),
                },
                HrvNight {
                    date: day(2),
                    last_night_avg: Some(66.0),
                    weekly_avg: Some(61.0),
                    status: "BALANCED".to_string(),
                },
            ],
            true,
        )
        .unwrap();
        // Computed mean is 53, the device says 61
        let view = hrv_view(&DerivedMetric::Hrv(series)).unwrap();

        assert_eq!(view.latest, "66");
        assert_eq!(view.weekly_average, "61");
        assert_eq!(view.delta_to_average, "+5");
        assert_eq!(view.trend, Trend::Favorable);
    }

    #[test]
    fn test_registry_rejects_mismatched_model() {
        let registry = build_view_registry().unwrap();
        let series = MetricSeries::new(vec![sleep(1, 420)], true).unwrap();
        let to_view = registry.resolve(&MetricId::Stress).unwrap();

        assert_eq!(
            to_view(&DerivedMetric::Sleep(series)),
            Err(PresentationError::UnexpectedModel {
                expected: MetricId::Stress,
                actual: MetricId::Sleep,
            })
        );
    }
}
