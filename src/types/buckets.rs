//! Time bucketing: analysis windows, day buckets, and week buckets.
//!
//! Every commit in a window belongs to exactly one day bucket and one week
//! bucket, determined by converting its authored timestamp into the
//! configured repository timezone. Weeks are Monday-anchored and truncated at
//! window edges, so a week bucket never spans more than 7 calendar days and
//! the union of all week buckets tiles the window.

use crate::errors::{ChronicleError, Result};
use crate::types::commit::{Change, Commit};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive time range over which commits are considered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl AnalysisWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self> {
        if start > end {
            return Err(ChronicleError::validation(
                "window.start",
                "must not be after window.end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Relative form: the N whole weeks ending at `now`
    pub fn last_weeks(weeks: u32, now: DateTime<FixedOffset>) -> Result<Self> {
        if weeks == 0 {
            return Err(ChronicleError::validation(
                "window.weeks",
                "must be at least 1",
            ));
        }
        let start = now - Duration::weeks(i64::from(weeks));
        Self::new(start, now)
    }

    /// Inclusive containment check
    pub fn contains(&self, ts: DateTime<FixedOffset>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// One calendar date's worth of commits (repository-local timezone)
#[derive(Debug, Clone)]
pub struct DayBucket {
    pub date: NaiveDate,
    /// Commits in authored-timestamp order
    pub commits: Vec<Commit>,
    /// First-parent of the earliest commit, `None` for a root commit
    pub day_start_parent: Option<String>,
    /// Latest commit in the bucket
    pub day_end: String,
}

/// A contiguous run of day buckets covering at most 7 calendar days
#[derive(Debug, Clone)]
pub struct WeekBucket {
    /// Canonical label, `week-of-<ISO date of the bucket's Monday>`
    pub label: String,
    /// Monday of the ISO week containing these days
    pub week_start: NaiveDate,
    /// Days in date order
    pub days: Vec<DayBucket>,
}

impl WeekBucket {
    /// First-parent boundary of the whole week, `None` for a root commit
    pub fn week_start_parent(&self) -> Option<String> {
        self.days.first().and_then(|d| d.day_start_parent.clone())
    }

    /// Latest commit in the week
    pub fn week_end(&self) -> Option<&str> {
        self.days.last().map(|d| d.day_end.as_str())
    }

    /// All commits in the week, in day and timestamp order
    pub fn commits(&self) -> impl Iterator<Item = &Commit> {
        self.days.iter().flat_map(|d| d.commits.iter())
    }
}

/// Monday of the ISO week containing `date`
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Canonical label for the week containing `date`
pub fn week_label_of(date: NaiveDate) -> String {
    format!("week-of-{}", week_start_of(date).format("%Y-%m-%d"))
}

/// Assign commits to day buckets by their authored date in `tz`.
///
/// Commits are re-sorted by authored timestamp; the reader already emits
/// ascending order but timestamp monotonicity across commits is not assumed.
pub fn bucket_by_day(mut commits: Vec<Commit>, tz: FixedOffset) -> Vec<DayBucket> {
    commits.sort_by_key(|c| c.authored_at);

    let mut days: Vec<DayBucket> = Vec::new();
    for commit in commits {
        let date = commit.authored_at.with_timezone(&tz).date_naive();
        match days.last_mut() {
            Some(day) if day.date == date => {
                day.day_end.clone_from(&commit.id);
                day.commits.push(commit);
            }
            _ => days.push(DayBucket {
                date,
                day_start_parent: commit.first_parent.clone(),
                day_end: commit.id.clone(),
                commits: vec![commit],
            }),
        }
    }
    days
}

/// Group day buckets into Monday-anchored week buckets
pub fn bucket_by_week(days: Vec<DayBucket>) -> Vec<WeekBucket> {
    let mut weeks: Vec<WeekBucket> = Vec::new();
    for day in days {
        let week_start = week_start_of(day.date);
        match weeks.last_mut() {
            Some(week) if week.week_start == week_start => week.days.push(day),
            _ => weeks.push(WeekBucket {
                label: week_label_of(day.date),
                week_start,
                days: vec![day],
            }),
        }
    }
    weeks
}

/// Daily narrative plus the changes aggregated from the day's commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySynthesis {
    pub date: NaiveDate,
    pub narrative: String,
    /// Deduplicated by (summary, category)
    pub changes: Vec<Change>,
}

/// Everything the merger needs for one week: the narrative section, the
/// aggregated changelog fragment, and the day syntheses.
///
/// The changelog fragment is built from commit-tier aggregation, never a
/// fresh LLM extraction, so no commit-level change can be dropped.
#[derive(Debug, Clone)]
pub struct WeekArtifact {
    pub label: String,
    pub week_start: NaiveDate,
    pub narrative: String,
    /// Union of all non-trivial commit changes in the week, deduplicated
    pub changes: Vec<Change>,
    pub days: Vec<DailySynthesis>,
}
