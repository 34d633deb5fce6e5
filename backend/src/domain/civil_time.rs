//! Fixed-offset civil time used for cancellation deadlines.
//!
//! Deadlines are wall-clock cutoffs in the service's home timezone, which
//! observes no daylight saving. The functions here are pure: they never read
//! the clock or the host timezone.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// Offset of the service's civil timezone from UTC, in seconds (UTC+09:00).
pub const SERVICE_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Default length of the free-cancellation window.
pub const DEFAULT_FREE_CANCELLATION_DAYS: u32 = 7;

/// Errors raised while computing civil deadlines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CivilTimeError {
    #[error("utc offset of {seconds}s is out of range")]
    InvalidOffset { seconds: i32 },
    #[error("check-in {check_in} is too early to subtract a {days}-day window")]
    OutOfRange { check_in: NaiveDate, days: u32 },
}

/// The service's fixed civil timezone.
pub fn service_offset() -> FixedOffset {
    FixedOffset::east_opt(SERVICE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Convert an instant into the service's civil timezone.
pub fn to_civil(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&service_offset())
}

/// Free-cancellation rule applied to every reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    window_days: u32,
    offset: FixedOffset,
}

impl CancellationPolicy {
    /// Policy with the given window in the service timezone.
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days,
            offset: service_offset(),
        }
    }

    /// Policy evaluated against an explicit UTC offset.
    pub fn with_offset_secs(window_days: u32, offset_secs: i32) -> Result<Self, CivilTimeError> {
        let offset = FixedOffset::east_opt(offset_secs).ok_or(CivilTimeError::InvalidOffset {
            seconds: offset_secs,
        })?;
        Ok(Self {
            window_days,
            offset,
        })
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Instant after which cancelling `check_in` is no longer free.
    ///
    /// The deadline is midnight civil time on the day `window_days` before
    /// check-in. Same date and policy always yield the same instant.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use lodging_backend::domain::CancellationPolicy;
    ///
    /// let policy = CancellationPolicy::new(7);
    /// let check_in = NaiveDate::from_ymd_opt(2025, 6, 10).expect("date");
    /// let deadline = policy.deadline_for(check_in).expect("deadline");
    /// assert_eq!(deadline.to_rfc3339(), "2025-06-03T00:00:00+09:00");
    /// ```
    pub fn deadline_for(&self, check_in: NaiveDate) -> Result<DateTime<FixedOffset>, CivilTimeError> {
        let out_of_range = || CivilTimeError::OutOfRange {
            check_in,
            days: self.window_days,
        };
        let day = check_in
            .checked_sub_days(Days::new(u64::from(self.window_days)))
            .ok_or_else(out_of_range)?;
        self.offset
            .from_local_datetime(&day.and_time(NaiveTime::MIN))
            .single()
            .ok_or_else(out_of_range)
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_CANCELLATION_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[rstest]
    #[case(7, date(2025, 6, 10), "2025-06-03T00:00:00+09:00")]
    #[case(0, date(2025, 6, 10), "2025-06-10T00:00:00+09:00")]
    #[case(7, date(2025, 3, 5), "2025-02-26T00:00:00+09:00")]
    #[case(7, date(2024, 3, 5), "2024-02-27T00:00:00+09:00")]
    fn deadline_is_civil_midnight(
        #[case] days: u32,
        #[case] check_in: NaiveDate,
        #[case] expected: &str,
    ) {
        let deadline = CancellationPolicy::new(days)
            .deadline_for(check_in)
            .expect("deadline");
        assert_eq!(deadline.to_rfc3339(), expected);
    }

    #[rstest]
    fn deadline_instant_is_previous_day_in_utc() {
        let deadline = CancellationPolicy::default()
            .deadline_for(date(2025, 6, 10))
            .expect("deadline");
        assert_eq!(
            deadline.with_timezone(&Utc).to_rfc3339(),
            "2025-06-02T15:00:00+00:00"
        );
    }

    #[rstest]
    fn deadline_is_deterministic() {
        let policy = CancellationPolicy::default();
        let check_in = date(2025, 12, 31);
        assert_eq!(policy.deadline_for(check_in), policy.deadline_for(check_in));
    }

    #[rstest]
    fn rejects_out_of_range_offsets() {
        assert_eq!(
            CancellationPolicy::with_offset_secs(7, 86_400),
            Err(CivilTimeError::InvalidOffset { seconds: 86_400 })
        );
    }

    #[rstest]
    fn reports_dates_that_underflow() {
        let result = CancellationPolicy::new(7).deadline_for(NaiveDate::MIN);
        assert!(matches!(result, Err(CivilTimeError::OutOfRange { .. })));
    }
}
