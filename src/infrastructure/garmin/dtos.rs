// Schema-validated Garmin Connect payloads
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid {series} payload at '{path}': {message}")]
pub struct SchemaValidationError {
    pub series: SeriesKind,
    pub path: String,
    pub message: String,
}

/// Concrete typed series, used as the key for model conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Sleep,
    SleepScore,
    RestingHeartRate,
    Hrv,
    BodyBattery,
    Stress,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeriesKind::Sleep => "sleep",
            SeriesKind::SleepScore => "sleep score",
            SeriesKind::RestingHeartRate => "resting heart rate",
            SeriesKind::Hrv => "HRV",
            SeriesKind::BodyBattery => "body battery",
            SeriesKind::Stress => "stress",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepEntryDto {
    pub calendar_date: NaiveDate,
    pub values: SleepValuesDto,
}

// Total sleep does not include awake time
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepValuesDto {
    pub total_sleep_seconds: i64,
    #[serde(default)]
    pub deep_sleep_seconds: Option<i64>,
    #[serde(default)]
    pub light_sleep_seconds: Option<i64>,
    #[serde(default, rename = "REMSleepSeconds")]
    pub rem_sleep_seconds: Option<i64>,
    #[serde(default)]
    pub awake_sleep_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepScoreEntryDto {
    pub calendar_date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestingHeartRateEntryDto {
    pub calendar_date: NaiveDate,
    pub values: RestingHeartRateValuesDto,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestingHeartRateValuesDto {
    #[serde(rename = "restingHR")]
    pub resting_hr: f64,
    #[serde(default, rename = "wellnessMaxAvgHR")]
    pub wellness_max_avg_hr: Option<f64>,
    #[serde(default, rename = "wellnessMinAvgHR")]
    pub wellness_min_avg_hr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrvResponseDto {
    pub hrv_summaries: Vec<HrvSummaryDto>,
    #[serde(default)]
    pub user_profile_pk: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrvSummaryDto {
    pub calendar_date: NaiveDate,
    #[serde(default)]
    pub weekly_avg: Option<f64>,
    /// Missing when the device was not worn overnight
    #[serde(default)]
    pub last_night_avg: Option<f64>,
    #[serde(default, rename = "lastNight5MinHigh")]
    pub last_night_5_min_high: Option<f64>,
    pub status: String,
    #[serde(default)]
    pub baseline: Option<HrvBaselineDto>,
    #[serde(default)]
    pub feedback_phrase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrvBaselineDto {
    pub low_upper: f64,
    pub balanced_low: f64,
    pub balanced_upper: f64,
    #[serde(default)]
    pub marker_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyBatteryEntryDto {
    #[serde(rename = "date")]
    pub calendar_date: NaiveDate,
    #[serde(default)]
    pub charged: Option<f64>,
    #[serde(default)]
    pub drained: Option<f64>,
    /// `[timestamp, level]` samples; a level may be null between syncs
    #[serde(default)]
    pub body_battery_values_array: Vec<(i64, Option<f64>)>,
}

impl BodyBatteryEntryDto {
    pub fn peak(&self) -> Option<f64> {
        self.body_battery_values_array
            .iter()
            .filter_map(|(_, level)| *level)
            .reduce(f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressEntryDto {
    pub calendar_date: NaiveDate,
    pub values: StressValuesDto,
}

// A duration is null when no time was spent in that stress band
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressValuesDto {
    pub overall_stress_level: f64,
    #[serde(default)]
    pub rest_stress_duration: Option<i64>,
    #[serde(default)]
    pub low_stress_duration: Option<i64>,
    #[serde(default)]
    pub medium_stress_duration: Option<i64>,
    #[serde(default)]
    pub high_stress_duration: Option<i64>,
}

/// A validated response for one metric
#[derive(Debug, Clone, PartialEq)]
pub enum TypedSeries {
    Sleep(Vec<SleepEntryDto>),
    SleepScore(Vec<SleepScoreEntryDto>),
    RestingHeartRate(Vec<RestingHeartRateEntryDto>),
    Hrv(HrvResponseDto),
    BodyBattery(Vec<BodyBatteryEntryDto>),
    Stress(Vec<StressEntryDto>),
}

impl TypedSeries {
    pub fn kind(&self) -> SeriesKind {
        match self {
            TypedSeries::Sleep(_) => SeriesKind::Sleep,
            TypedSeries::SleepScore(_) => SeriesKind::SleepScore,
            TypedSeries::RestingHeartRate(_) => SeriesKind::RestingHeartRate,
            TypedSeries::Hrv(_) => SeriesKind::Hrv,
            TypedSeries::BodyBattery(_) => SeriesKind::BodyBattery,
            TypedSeries::Stress(_) => SeriesKind::Stress,
        }
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        match self {
            TypedSeries::Sleep(e) => e.iter().map(|x| x.calendar_date).collect(),
            TypedSeries::SleepScore(e) => e.iter().map(|x| x.calendar_date).collect(),
            TypedSeries::RestingHeartRate(e) => e.iter().map(|x| x.calendar_date).collect(),
            TypedSeries::Hrv(r) => r.hrv_summaries.iter().map(|x| x.calendar_date).collect(),
            TypedSeries::BodyBattery(e) => e.iter().map(|x| x.calendar_date).collect(),
            TypedSeries::Stress(e) => e.iter().map(|x| x.calendar_date).collect(),
        }
    }

    pub fn has_entry_on(&self, date: NaiveDate) -> bool {
        self.dates().contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate<T: DeserializeOwned>(series: SeriesKind, json: &Value) -> Result<T, SchemaValidationError> {
    serde_path_to_error::deserialize(json).map_err(|e| SchemaValidationError {
        series,
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}

pub fn parse_sleep(json: &Value) -> Result<TypedSeries, SchemaValidationError> {
    validate(SeriesKind::Sleep, json).map(TypedSeries::Sleep)
}

pub fn parse_sleep_score(json: &Value) -> Result<TypedSeries, SchemaValidationError> {
    validate(SeriesKind::SleepScore, json).map(TypedSeries::SleepScore)
}

pub fn parse_resting_heart_rate(json: &Value) -> Result<TypedSeries, SchemaValidationError> {
    validate(SeriesKind::RestingHeartRate, json).map(TypedSeries::RestingHeartRate)
}

pub fn parse_hrv(json: &Value) -> Result<TypedSeries, SchemaValidationError> {
    validate(SeriesKind::Hrv, json).map(TypedSeries::Hrv)
}

pub fn parse_body_battery(json: &Value) -> Result<TypedSeries, SchemaValidationError> {
    validate(SeriesKind::BodyBattery, json).map(TypedSeries::BodyBattery)
}

pub fn parse_stress(json: &Value) -> Result<TypedSeries, SchemaValidationError> {
    validate(SeriesKind::Stress, json).map(TypedSeries::Stress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_sleep() {
        let json = json!([
            {
                "calendarDate": "2024-05-02",
                "values": {
                    "totalSleepSeconds": 27000,
                    "deepSleepSeconds": 5400,
                    "lightSleepSeconds": 15000,
                    "REMSleepSeconds": 6600,
                    "awakeSleepSeconds": 600
                }
            },
            {
                "calendarDate": "2024-05-01",
                "values": { "totalSleepSeconds": 25200 }
            }
        ]);

        let series = parse_sleep(&json).unwrap();
        assert_eq!(series.kind(), SeriesKind::Sleep);
        assert_eq!(series.dates(), vec![date("2024-05-02"), date("2024-05-01")]);
        assert!(series.has_entry_on(date("2024-05-01")));
        assert!(!series.has_entry_on(date("2024-05-03")));

        let TypedSeries::Sleep(entries) = series else {
            panic!("expected sleep series");
        };
        assert_eq!(entries[0].values.rem_sleep_seconds, Some(6600));
        assert_eq!(entries[1].values.deep_sleep_seconds, None);
    }

    #[test]
    fn test_schema_error_names_field_path() {
        let json = json!([
            { "calendarDate": "2024-05-01", "values": { "totalSleepSeconds": 25200 } },
            { "calendarDate": "2024-05-02", "values": { "totalSleepSeconds": "a lot" } }
        ]);

        let err = parse_sleep(&json).unwrap_err();
        assert_eq!(err.series, SeriesKind::Sleep);
        assert_eq!(err.path, "[1].values.totalSleepSeconds");
        assert!(err.to_string().contains("[1].values.totalSleepSeconds"));
    }

    #[test]
    fn test_schema_error_on_missing_field() {
        let json = json!([{ "calendarDate": "2024-05-01" }]);
        let err = parse_stress(&json).unwrap_err();
        assert_eq!(err.series, SeriesKind::Stress);
        assert!(err.message.contains("values"));
    }

    #[test]
    fn test_parse_hrv_with_missing_night() {
        let json = json!({
            "userProfilePk": 1234,
            "hrvSummaries": [
                {
                    "calendarDate": "2024-05-01",
                    "weeklyAvg": 48,
                    "lastNightAvg": 52,
                    "lastNight5MinHigh": 70,
                    "status": "BALANCED",
                    "baseline": { "lowUpper": 40, "balancedLow": 44, "balancedUpper": 58, "markerValue": 0.5 },
                    "feedbackPhrase": "HRV_BALANCED_2"
                },
                {
                    "calendarDate": "2024-05-02",
                    "weeklyAvg": 48,
                    "lastNightAvg": null,
                    "status": "BALANCED"
                }
            ]
        });

        let series = parse_hrv(&json).unwrap();
        let TypedSeries::Hrv(response) = &series else {
            panic!("expected hrv series");
        };
        assert_eq!(response.hrv_summaries[0].last_night_avg, Some(52.0));
        assert_eq!(response.hrv_summaries[1].last_night_avg, None);
        assert!(series.has_entry_on(date("2024-05-02")));
    }

    #[test]
    fn test_body_battery_peak() {
        let json = json!([{
            "date": "2024-05-02",
            "charged": 60,
            "drained": 45,
            "bodyBatteryValuesArray": [[1714600000000i64, 35], [1714610000000i64, null], [1714620000000i64, 88]]
        }]);

        let TypedSeries::BodyBattery(entries) = parse_body_battery(&json).unwrap() else {
            panic!("expected body battery series");
        };
        assert_eq!(entries[0].peak(), Some(88.0));
    }

    #[test]
    fn test_parse_resting_heart_rate_and_scores() {
        let rhr = json!([{ "calendarDate": "2024-05-02", "values": { "restingHR": 51 } }]);
        let series = parse_resting_heart_rate(&rhr).unwrap();
        assert_eq!(series.kind(), SeriesKind::RestingHeartRate);
        assert_eq!(series.len(), 1);

        let scores = json!([{ "calendarDate": "2024-05-02", "value": 81 }]);
        assert_eq!(parse_sleep_score(&scores).unwrap().kind(), SeriesKind::SleepScore);
    }
}
