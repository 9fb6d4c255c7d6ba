// Scheduler service - Daily summary job with jittered retries while data is incomplete
use crate::application::notification::{ExceptionHandler, SummaryReadyHandler};
use crate::application::summary_service::{SummaryOutcome, SummarySource};
use crate::application::time_source::TimeSource;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Delay before a missed job fires after startup
const STARTUP_DELAY: TimeDelta = TimeDelta::seconds(3);

/// Upper bound on a single sleep so wall clock changes are noticed
const MAX_SLEEP: Duration = Duration::from_secs(300);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Retry bounds must satisfy 0 < min <= max, got {min_minutes}..{max_minutes} minutes")]
    InvalidRetryBounds { min_minutes: i64, max_minutes: i64 },

    #[error("No jobs have been scheduled")]
    NoJobs,
}

/// Bounds for the randomized delay before checking again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    min: TimeDelta,
    max: TimeDelta,
}

impl RetryPolicy {
    pub fn from_minutes(min_minutes: i64, max_minutes: i64) -> Result<Self, SchedulerError> {
        if min_minutes <= 0 || min_minutes > max_minutes {
            return Err(SchedulerError::InvalidRetryBounds {
                min_minutes,
                max_minutes,
            });
        }
        Ok(Self {
            min: TimeDelta::minutes(min_minutes),
            max: TimeDelta::minutes(max_minutes),
        })
    }

    pub fn min(&self) -> TimeDelta {
        self.min
    }

    pub fn max(&self) -> TimeDelta {
        self.max
    }

    /// Uniform delay strictly between min and max; the midpoint when they are too close
    pub fn sample<R: Rng>(&self, rng: &mut R) -> TimeDelta {
        let min = self.min.num_milliseconds();
        let max = self.max.num_milliseconds();
        if max - min < 2 {
            return TimeDelta::milliseconds(min + (max - min) / 2);
        }
        TimeDelta::milliseconds(rng.random_range(min + 1..max))
    }
}

/// Resolves a local wall clock time to an instant. A time skipped by a DST
/// change moves forward an hour; a repeated time takes its first occurrence.
pub fn occurrence_on(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let local = date.and_time(time);
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + TimeDelta::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

/// First occurrence of `time` in `tz` strictly after `after`
pub fn next_daily_occurrence(after: DateTime<Utc>, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let today = after.with_timezone(&tz).date_naive();
    let candidate = occurrence_on(today, time, tz);
    if candidate > after {
        return candidate;
    }
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    occurrence_on(tomorrow, time, tz)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DailyJob {
    name: String,
    time: NaiveTime,
    next_fire: DateTime<Utc>,
}

/// What one firing of a job did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Notified(NaiveDate),
    NotReady,
    AlreadyNotified(NaiveDate),
    Failed,
}

pub struct SummaryScheduler {
    source: Arc<dyn SummarySource>,
    on_ready: Arc<dyn SummaryReadyHandler>,
    on_exception: Arc<dyn ExceptionHandler>,
    clock: Arc<dyn TimeSource>,
    time_zone: Tz,
    retry: RetryPolicy,
    rng: StdRng,
    jobs: Vec<DailyJob>,
    last_notified: Option<NaiveDate>,
}

impl SummaryScheduler {
    pub fn new(
        source: Arc<dyn SummarySource>,
        on_ready: Arc<dyn SummaryReadyHandler>,
        on_exception: Arc<dyn ExceptionHandler>,
        clock: Arc<dyn TimeSource>,
        time_zone: Tz,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            on_ready,
            on_exception,
            clock,
            time_zone,
            retry,
            rng: StdRng::from_os_rng(),
            jobs: Vec::new(),
            last_notified: None,
        }
    }

    #[cfg(test)]
    fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Schedules a daily check at `time` in the scheduler's time zone. With
    /// `run_if_missed`, a time that already passed today fires shortly after startup.
    pub fn add_daily_job(&mut self, time: NaiveTime, name: impl Into<String>, run_if_missed: bool) {
        let name = name.into();
        let now = self.clock.now();
        let today = now.with_timezone(&self.time_zone).date_naive();
        let todays_fire = occurrence_on(today, time, self.time_zone);

        let next_fire = if todays_fire > now {
            todays_fire
        } else if run_if_missed {
            info!("{} was due at {} today, running shortly", name, time);
            now + STARTUP_DELAY
        } else {
            next_daily_occurrence(now, time, self.time_zone)
        };

        info!(
            "Scheduled {} daily at {} {}, first run at {}",
            name,
            time,
            self.time_zone,
            next_fire.with_timezone(&self.time_zone)
        );
        self.jobs.push(DailyJob {
            name,
            time,
            next_fire,
        });
    }

    pub fn next_fire_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.jobs.iter().find(|j| j.name == name).map(|j| j.next_fire)
    }

    pub fn last_notified(&self) -> Option<NaiveDate> {
        self.last_notified
    }

    fn earliest_fire(&self) -> Option<DateTime<Utc>> {
        self.jobs.iter().map(|j| j.next_fire).min()
    }

    /// Processes the schedule forever
    pub async fn run(&mut self) -> Result<(), SchedulerError> {
        if self.jobs.is_empty() {
            return Err(SchedulerError::NoJobs);
        }
        loop {
            let now = self.clock.now();
            if let Some(next) = self.earliest_fire() {
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                if !wait.is_zero() {
                    debug!("Sleeping {:?} until {}", wait.min(MAX_SLEEP), next);
                    tokio::time::sleep(wait.min(MAX_SLEEP)).await;
                    continue;
                }
            }
            self.fire_due().await;
        }
    }

    /// Runs every job whose fire time has been reached
    pub async fn fire_due(&mut self) -> Vec<JobOutcome> {
        let now = self.clock.now();
        let due: Vec<usize> = (0..self.jobs.len())
            .filter(|&i| self.jobs[i].next_fire <= now)
            .collect();

        let mut outcomes = Vec::with_capacity(due.len());
        for index in due {
            outcomes.push(self.run_job(index).await);
        }
        outcomes
    }

    /// Checks today immediately without touching any job's schedule
    pub async fn check_now(&mut self, name: &str) -> JobOutcome {
        let today = self.clock.now().with_timezone(&self.time_zone).date_naive();
        self.execute(name, today).await
    }

    async fn run_job(&mut self, index: usize) -> JobOutcome {
        let now = self.clock.now();
        let (name, time) = {
            let job = &self.jobs[index];
            (job.name.clone(), job.time)
        };

        // Back on the normal schedule unless "not ready" says otherwise
        let normal_next = next_daily_occurrence(now, time, self.time_zone);
        self.jobs[index].next_fire = normal_next;

        let today = now.with_timezone(&self.time_zone).date_naive();
        let outcome = self.execute(&name, today).await;
        if outcome == JobOutcome::NotReady {
            let retry_at = (now + self.retry.sample(&mut self.rng)).min(normal_next);
            self.jobs[index].next_fire = retry_at;
            info!(
                "Data for {} not ready, {} retries at {}",
                today,
                name,
                retry_at.with_timezone(&self.time_zone)
            );
        } else {
            debug!(
                "{} next runs at {}",
                name,
                normal_next.with_timezone(&self.time_zone)
            );
        }
        outcome
    }

    // Fault boundary: errors and panics from the pipeline or the ready handler
    // go to the exception handler and never escape
    async fn execute(&mut self, name: &str, today: NaiveDate) -> JobOutcome {
        if self.last_notified == Some(today) {
            info!("Summary for {} already sent, skipping {}", today, name);
            return JobOutcome::AlreadyNotified(today);
        }

        let attempt = AssertUnwindSafe(check_and_notify(
            self.source.clone(),
            self.on_ready.clone(),
            today,
        ))
        .catch_unwind()
        .await;

        let error = match attempt {
            Ok(Ok(true)) => {
                self.last_notified = Some(today);
                info!("{} sent the summary for {}", name, today);
                return JobOutcome::Notified(today);
            }
            Ok(Ok(false)) => return JobOutcome::NotReady,
            Ok(Err(e)) => e,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                anyhow::anyhow!("{} panicked: {}", name, message)
            }
        };

        error!("{} failed: {:#}", name, error);
        self.on_exception.on_exception(name, &error).await;
        JobOutcome::Failed
    }
}

/// True once the ready handler has accepted a complete summary
async fn check_and_notify(
    source: Arc<dyn SummarySource>,
    on_ready: Arc<dyn SummaryReadyHandler>,
    today: NaiveDate,
) -> anyhow::Result<bool> {
    match source.try_get_summary(today).await? {
        SummaryOutcome::Ready(summary) => {
            on_ready.on_summary_ready(summary).await?;
            Ok(true)
        }
        SummaryOutcome::NotReady { metric, reason } => {
            debug!("Waiting on {}: {}", metric, reason);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::summary_service::{NotReadyReason, PipelineError};
    use crate::application::time_source::ManualClock;
    use crate::domain::metric_id::MetricId;
    use crate::domain::summary::HealthSummary;
    use crate::infrastructure::garmin::dtos::{SchemaValidationError, SeriesKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Mode {
        Ready,
        NotReady,
        SchemaError,
        Panic,
    }

    struct FakeSource {
        mode: Mutex<Mode>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode: Mutex::new(mode),
                calls: AtomicUsize::new(0),
            })
        }

        fn set(&self, mode: Mode) {
            *self.mode.lock().unwrap() = mode;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummarySource for FakeSource {
        async fn try_get_summary(&self, date: NaiveDate) -> Result<SummaryOutcome, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mode = *self.mode.lock().unwrap();
            match mode {
                Mode::Ready => Ok(SummaryOutcome::Ready(HealthSummary::new(date, vec![]))),
                Mode::NotReady => Ok(SummaryOutcome::NotReady {
                    metric: MetricId::Sleep,
                    reason: NotReadyReason::MissingDate(date),
                }),
                Mode::SchemaError => Err(PipelineError::Schema(SchemaValidationError {
                    series: SeriesKind::Sleep,
                    path: "[0].values.totalSleepSeconds".to_string(),
                    message: "missing field".to_string(),
                })),
                Mode::Panic => panic!("gateway exploded"),
            }
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        summaries: Mutex<Vec<NaiveDate>>,
    }

    #[async_trait]
    impl SummaryReadyHandler for RecordingHandler {
        async fn on_summary_ready(&self, summary: HealthSummary) -> anyhow::Result<()> {
            self.summaries.lock().unwrap().push(summary.date);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingExceptions {
        messages: Mutex<Vec<String>>,
        schema_errors: AtomicUsize,
    }

    #[async_trait]
    impl ExceptionHandler for RecordingExceptions {
        async fn on_exception(&self, _job: &str, error: &anyhow::Error) {
            if let Some(PipelineError::Schema(_)) = error.downcast_ref::<PipelineError>() {
                self.schema_errors.fetch_add(1, Ordering::SeqCst);
            }
            self.messages.lock().unwrap().push(error.to_string());
        }
    }

    struct Harness {
        scheduler: SummaryScheduler,
        clock: Arc<ManualClock>,
        source: Arc<FakeSource>,
        handler: Arc<RecordingHandler>,
        exceptions: Arc<RecordingExceptions>,
    }

    const JOB: &str = "daily-summary";

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, h, m, 0).unwrap()
    }

    fn seven() -> NaiveTime {
        NaiveTime::from_hms_opt(7, 0, 0).unwrap()
    }

    fn harness(mode: Mode, now: DateTime<Utc>, run_if_missed: bool) -> Harness {
        let clock = Arc::new(ManualClock::new(now));
        let source = FakeSource::new(mode);
        let handler = Arc::new(RecordingHandler::default());
        let exceptions = Arc::new(RecordingExceptions::default());
        let mut scheduler = SummaryScheduler::new(
            source.clone(),
            handler.clone(),
            exceptions.clone(),
            clock.clone(),
            Tz::UTC,
            RetryPolicy::from_minutes(30, 60).unwrap(),
        )
        .with_seed(7);
        scheduler.add_daily_job(seven(), JOB, run_if_missed);
        Harness {
            scheduler,
            clock,
            source,
            handler,
            exceptions,
        }
    }

    #[test]
    fn test_retry_policy_bounds() {
        assert!(RetryPolicy::from_minutes(0, 10).is_err());
        assert!(RetryPolicy::from_minutes(60, 30).is_err());

        let policy = RetryPolicy::from_minutes(30, 60).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let delay = policy.sample(&mut rng);
            assert!(delay > TimeDelta::minutes(30) && delay < TimeDelta::minutes(60));
        }

        let fixed = RetryPolicy::from_minutes(45, 45).unwrap();
        assert_eq!(fixed.sample(&mut rng), TimeDelta::minutes(45));
    }

    #[test]
    fn test_next_daily_occurrence_across_dst() {
        let tz: Tz = "Europe/Oslo".parse().unwrap();
        let time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();

        // 02:30 does not exist on 2024-03-31 in Oslo and moves to 03:30 CEST
        let after = Utc.with_ymd_and_hms(2024, 3, 30, 12, 0, 0).unwrap();
        let next = next_daily_occurrence(after, time, tz);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap());

        // Exactly at the fire time means tomorrow
        let next = next_daily_occurrence(at(7, 0), seven(), Tz::UTC);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 3, 7, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_not_ready_reschedules_within_retry_window() {
        let mut h = harness(Mode::NotReady, at(6, 0), false);
        let normal = at(7, 0);
        assert_eq!(h.scheduler.next_fire_time(JOB), Some(normal));

        h.clock.set(normal);
        let outcomes = h.scheduler.fire_due().await;
        assert_eq!(outcomes, vec![JobOutcome::NotReady]);

        let next = h.scheduler.next_fire_time(JOB).unwrap();
        assert!(next > normal + TimeDelta::minutes(30));
        assert!(next < normal + TimeDelta::minutes(60));
        assert_ne!(next, next_daily_occurrence(normal, seven(), Tz::UTC));
        assert!(h.exceptions.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schema_error_is_reported_and_schedule_unchanged() {
        let mut h = harness(Mode::SchemaError, at(6, 0), false);
        h.clock.set(at(7, 0));

        let outcomes = h.scheduler.fire_due().await;
        assert_eq!(outcomes, vec![JobOutcome::Failed]);
        assert_eq!(h.exceptions.schema_errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.scheduler.next_fire_time(JOB),
            Some(Utc.with_ymd_and_hms(2024, 5, 3, 7, 0, 0).unwrap())
        );
        assert!(h.handler.summaries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut h = harness(Mode::Panic, at(6, 0), false);
        h.clock.set(at(7, 0));

        let outcomes = h.scheduler.fire_due().await;
        assert_eq!(outcomes, vec![JobOutcome::Failed]);
        let messages = h.exceptions.messages.lock().unwrap().clone();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("gateway exploded"));
    }

    #[tokio::test]
    async fn test_ready_notifies_once_per_day() {
        let mut h = harness(Mode::NotReady, at(6, 0), false);
        h.clock.set(at(7, 0));
        h.scheduler.fire_due().await;

        let retry_at = h.scheduler.next_fire_time(JOB).unwrap();
        h.source.set(Mode::Ready);
        h.clock.set(retry_at);
        let outcomes = h.scheduler.fire_due().await;

        let today = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(outcomes, vec![JobOutcome::Notified(today)]);
        assert_eq!(*h.handler.summaries.lock().unwrap(), vec![today]);
        assert_eq!(
            h.scheduler.next_fire_time(JOB),
            Some(Utc.with_ymd_and_hms(2024, 5, 3, 7, 0, 0).unwrap())
        );

        // A manual check later the same day does not notify again
        assert_eq!(
            h.scheduler.check_now(JOB).await,
            JobOutcome::AlreadyNotified(today)
        );
        assert_eq!(h.handler.summaries.lock().unwrap().len(), 1);
        assert_eq!(h.source.calls(), 2);
        assert_eq!(h.scheduler.last_notified(), Some(today));
    }

    #[tokio::test]
    async fn test_retry_is_capped_at_next_normal_run() {
        let mut h = harness(Mode::NotReady, at(6, 0), false);
        h.clock.set(Utc.with_ymd_and_hms(2024, 5, 3, 6, 45, 0).unwrap());
        // Pretend the job was due late in the evening retry chain
        h.scheduler.jobs[0].next_fire = h.clock.now();

        h.scheduler.fire_due().await;
        assert_eq!(
            h.scheduler.next_fire_time(JOB),
            Some(Utc.with_ymd_and_hms(2024, 5, 3, 7, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_missed_job_runs_shortly_after_startup() {
        let h = harness(Mode::Ready, at(9, 0), true);
        assert_eq!(
            h.scheduler.next_fire_time(JOB),
            Some(at(9, 0) + TimeDelta::seconds(3))
        );

        let h = harness(Mode::Ready, at(9, 0), false);
        assert_eq!(
            h.scheduler.next_fire_time(JOB),
            Some(Utc.with_ymd_and_hms(2024, 5, 3, 7, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_nothing_fires_before_due() {
        let mut h = harness(Mode::Ready, at(6, 0), false);
        h.clock.set(at(6, 59));
        assert!(h.scheduler.fire_due().await.is_empty());
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_without_jobs_fails() {
        let clock = Arc::new(ManualClock::new(at(6, 0)));
        let mut scheduler = SummaryScheduler::new(
            FakeSource::new(Mode::Ready),
            Arc::new(RecordingHandler::default()),
            Arc::new(RecordingExceptions::default()),
            clock,
            Tz::UTC,
            RetryPolicy::from_minutes(30, 60).unwrap(),
        );
        assert_eq!(scheduler.run().await, Err(SchedulerError::NoJobs));
    }
}
