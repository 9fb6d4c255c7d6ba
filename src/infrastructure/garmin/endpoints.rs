// Garmin Connect date-range endpoints
use crate::domain::period::DatePeriod;
use std::fmt;

/// Remote operation that produced a raw response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    DailySleep,
    DailySleepScore,
    DailyRestingHeartRate,
    DailyHrv,
    DailyBodyBattery,
    DailyStress,
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::DailySleep,
        Endpoint::DailySleepScore,
        Endpoint::DailyRestingHeartRate,
        Endpoint::DailyHrv,
        Endpoint::DailyBodyBattery,
        Endpoint::DailyStress,
    ];

    fn template(self) -> &'static str {
        match self {
            Endpoint::DailySleep => "/wellness-service/stats/sleep/daily/{start}/{end}",
            Endpoint::DailySleepScore => "/wellness-service/stats/daily/sleep/score/{start}/{end}",
            Endpoint::DailyRestingHeartRate => {
                "/usersummary-service/stats/heartRate/daily/{start}/{end}"
            }
            Endpoint::DailyHrv => "/hrv-service/hrv/daily/{start}/{end}",
            Endpoint::DailyBodyBattery => {
                "/wellness-service/wellness/bodyBattery/reports/daily?startDate={start}&endDate={end}"
            }
            Endpoint::DailyStress => "/usersummary-service/stats/stress/daily/{start}/{end}",
        }
    }

    /// Path and query for the period, dates formatted as YYYY-MM-DD
    pub fn path(self, period: &DatePeriod) -> String {
        self.template()
            .replace("{start}", &period.start().format("%Y-%m-%d").to_string())
            .replace("{end}", &period.end().format("%Y-%m-%d").to_string())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.template();
        let path = path.split('?').next().unwrap_or(path);
        f.write_str(path.trim_end_matches("/{start}/{end}"))
    }
}
