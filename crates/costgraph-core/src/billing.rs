use chrono::{DateTime, Datelike, NaiveDate, Utc};

pub const SECONDS_PER_HOUR: f64 = 3600.0;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingWindow {
    start: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl BillingWindow {
    pub fn current_month(now: DateTime<Utc>) -> Self {
        Self {
            start: month_start(now),
            now,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn elapsed_seconds(&self) -> f64 {
        seconds_between(self.start, self.now)
    }

    /// Hours a workload accrued inside the window. Time before the window
    /// start never counts, and inconsistent timestamps clamp to zero.
    pub fn prorated_hours(
        &self,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
    ) -> f64 {
        let since_start = seconds_between(started_at, self.now).min(self.elapsed_seconds());
        let since_end = ended_at
            .map(|ended_at| seconds_between(ended_at, self.now))
            .unwrap_or(0.0);

        ((since_start - since_end) / SECONDS_PER_HOUR).max(0.0)
    }
}
