//! Query windows for calendar retrieval.
//!
//! [`TimeWindow`] is the `[start, end)` range a caller asks events for. When
//! no window is supplied, adapters fall back to [`TimeWindow::around`] with a
//! span wide enough to behave like "unbounded".

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// A half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a window, returning `None` when `start` is after `end`.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Creates a window from a start time and a duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(start, start + duration)
    }

    /// Creates a window reaching `years` back and forth from `now`.
    ///
    /// Saturates at chrono's representable range instead of failing.
    pub fn around(now: DateTime<Utc>, years: u32) -> Self {
        let months = Months::new(years.saturating_mul(12));
        let start = now.checked_sub_months(months).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = now.checked_add_months(months).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    /// Completes a partially specified window.
    ///
    /// A missing bound is replaced by `now` shifted by `years` in the
    /// corresponding direction. Returns `None` if both bounds are missing.
    pub fn complete(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        years: u32,
    ) -> Option<Self> {
        if start.is_none() && end.is_none() {
            return None;
        }
        let fallback = Self::around(now, years);
        Self::try_new(start.unwrap_or(fallback.start), end.unwrap_or(fallback.end))
    }

    /// Returns the duration of this window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks whether a datetime falls within `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks whether `[start, end)` intersects this window.
    ///
    /// Zero-length ranges count as overlapping when their instant lies inside
    /// the window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start == end {
            return self.contains(start);
        }
        start < self.end && end > self.start
    }

    /// Extends the window by the given duration on both ends.
    pub fn extend(&self, duration: Duration) -> Self {
        Self {
            start: self.start - duration,
            end: self.end + duration,
        }
    }
}
