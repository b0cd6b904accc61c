use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds in one day. Periods are entered in days and stored in ms.
pub const MS_PER_DAY: u64 = 86_400_000;

/// Unique identifier for a job within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// The id after this one, or `None` at the top of the id space
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reasons a job record breaks the job invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("period must be at least one day")]
    PeriodTooShort,
    #[error("period of {0} ms is not a whole number of days")]
    PartialDay(u64),
}

/// A recurring chore.
///
/// Fields are private so every `Job`, including decoded ones, has a
/// non-empty title and a period that is a positive number of whole days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "JobRecord")]
pub struct Job {
    title: String,
    /// Time between required completions, in ms.
    period: u64,
    /// Last completion, in ms since the epoch. `None` means never done.
    last_done: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRecord {
    title: String,
    period: u64,
    last_done: Option<i64>,
}

impl TryFrom<JobRecord> for Job {
    type Error = JobError;

    fn try_from(record: JobRecord) -> Result<Self, Self::Error> {
        Job::new(record.title, record.period, record.last_done)
    }
}

impl Job {
    pub fn new<S: Into<String>>(title: S, period: u64, last_done: Option<i64>) -> Result<Self, JobError> {
        let title = title.into();
        if title.is_empty() {
            return Err(JobError::EmptyTitle);
        }
        if period == 0 {
            return Err(JobError::PeriodTooShort);
        }
        if period % MS_PER_DAY != 0 {
            return Err(JobError::PartialDay(period));
        }

        Ok(Self {
            title,
            period,
            last_done,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Time between required completions, in ms
    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn last_done(&self) -> Option<i64> {
        self.last_done
    }

    pub(crate) fn mark_done(&mut self, at: i64) {
        self.last_done = Some(at);
    }

    /// Whole days in the job's period
    pub fn period_days(&self) -> u64 {
        self.period / MS_PER_DAY
    }

    /// How far past its due time the job is at `now`.
    ///
    /// Returns `None` while the job is not yet due. A job that was never
    /// done is [`Overdue::Never`], which outranks every finite amount.
    pub fn overdue(&self, now: i64) -> Option<Overdue> {
        let Some(last_done) = self.last_done else {
            return Some(Overdue::Never);
        };

        let period = i64::try_from(self.period).unwrap_or(i64::MAX);
        let due_at = last_done.saturating_add(period);
        if now < due_at {
            return None;
        }

        Some(Overdue::By(now.abs_diff(due_at)))
    }

    /// Whole days elapsed since the last completion, if there was one
    pub fn days_since_done(&self, now: i64) -> Option<i64> {
        self.last_done
            .map(|at| now.saturating_sub(at) / MS_PER_DAY as i64)
    }
}

/// Overdue amount of a job.
///
/// `By` carries the milliseconds past the due time. `Never` is the
/// sentinel for jobs that have never been done and compares greater than
/// any `By`, so the derived ordering is the display ordering reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Overdue {
    By(u64),
    Never,
}

/// Reasons a draft cannot become a job, in the order they are checked
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("period must be a whole number of days")]
    PeriodNotInteger,
    #[error("period must be at least one day")]
    PeriodTooShort,
    #[error("period is too long")]
    PeriodTooLong,
}

/// A single field of the new-job form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftField {
    Title(String),
    Period(String),
}

/// Unvalidated input for a new job, exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDraft {
    pub title: String,
    /// Period in days, as text.
    pub period: String,
}

impl JobDraft {
    pub fn new<T: Into<String>, P: Into<String>>(title: T, period: P) -> Self {
        Self {
            title: title.into(),
            period: period.into(),
        }
    }

    pub fn set(&mut self, field: DraftField) {
        match field {
            DraftField::Title(title) => self.title = title,
            DraftField::Period(period) => self.period = period,
        }
    }

    /// Validate the draft and build a job that has never been done
    pub fn build(&self) -> Result<Job, DraftError> {
        if self.title.is_empty() {
            return Err(DraftError::EmptyTitle);
        }

        let days: i64 = self
            .period
            .parse()
            .map_err(|_| DraftError::PeriodNotInteger)?;
        if days < 1 {
            return Err(DraftError::PeriodTooShort);
        }

        let period = (days as u64)
            .checked_mul(MS_PER_DAY)
            .ok_or(DraftError::PeriodTooLong)?;

        Ok(Job {
            title: self.title.clone(),
            period,
            last_done: None,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.build().is_ok()
    }
}
